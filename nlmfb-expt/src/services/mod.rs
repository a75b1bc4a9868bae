//! Services: external API clients and results ingestion

pub mod captcha_client;
pub mod mturk_client;
pub mod results_backup;
pub mod results_ingester;

pub use captcha_client::{CaptchaClient, CaptchaError};
pub use mturk_client::{CreditOutcome, MturkClient, MturkError};
pub use results_backup::save_json_results;
pub use results_ingester::{partition_results, store_results, PartitionedResults};
