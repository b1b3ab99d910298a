pub mod access_points;
pub mod init;
pub mod issue;
pub mod qr;
pub mod revoke;
pub mod scan;
pub mod status;
