pub mod course;
pub mod notification;
pub mod user;

pub use course::{Course, CourseInput};
pub use notification::{
    NewDelivery, NewSendNotification, ReceiveNotification, SendMethod, SendNotification, Sender,
};
pub use user::{
    AccountChanges, AdminProfile, Level, NewAccount, Role, StudentProfile, User,
};
