pub mod attendance;
pub mod employee;
pub mod export;
pub mod payroll;
