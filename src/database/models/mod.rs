pub mod activity;
pub mod cycle;
pub mod daily_record;
pub mod settings;
pub mod user;

pub use activity::*;
pub use cycle::*;
pub use daily_record::*;
pub use settings::*;
pub use user::*;
