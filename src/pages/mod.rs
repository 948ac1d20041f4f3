pub mod background_segmentation;
pub mod history;
pub mod home;
pub mod linear_regression;
