pub mod alert_box;
pub mod drop_zone;
pub mod history_list;
pub mod navbar;
pub mod progress_bar;
