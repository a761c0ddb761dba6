pub mod audit_logs;
pub mod events;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod sea_orm_active_enums;
pub mod ticket_types;
pub mod tickets;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use events::Entity as Events;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use ticket_types::Entity as TicketTypes;
pub use tickets::Entity as Tickets;
pub use users::Entity as Users;
