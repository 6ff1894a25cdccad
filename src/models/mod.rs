pub mod jobmodel;
