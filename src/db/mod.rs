pub mod applicationdb;
pub mod db;
pub mod jobdb;
pub mod statuslogdb;

#[cfg(test)]
pub mod memorydb;
