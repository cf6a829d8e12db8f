/*!
 * Storage protocols for pipeline items
 */

pub mod s3;
