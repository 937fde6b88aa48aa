pub mod attendance;
pub mod employee;
pub mod month;
pub mod payroll;
pub mod role;
pub mod user;
