pub mod session;
pub mod task;
pub mod user;

pub use session::Session;
pub use task::{CreateTask, Task, TaskFilter, UpdateTask};
pub use user::{CreateUser, Credentials, UpdateUser, User, UserBody};
