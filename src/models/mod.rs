pub mod lifecycle;
pub mod remark;
pub mod report;
pub mod role;
pub mod user;

pub use lifecycle::{LifecycleState, ReportStage, ReportStatus};
pub use remark::{Entity as Remark, Model as RemarkModel};
pub use report::{Entity as Report, Means, Model as ReportModel};
pub use role::Role;
pub use user::{Entity as User, Model as UserModel};
