pub mod doctor;
pub mod extract;
pub mod init;
pub mod serve;
