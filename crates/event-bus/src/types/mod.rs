pub mod report_failure;
pub mod run_info;
