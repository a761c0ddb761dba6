use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::TicketStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_type_id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub status: TicketStatus,
    pub checked_in_at: Option<DateTimeWithTimeZone>,
    pub qr_image_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_delete = "Cascade"
    )]
    Orders,
    #[sea_orm(
        belongs_to = "super::ticket_types::Entity",
        from = "Column::TicketTypeId",
        to = "super::ticket_types::Column::Id"
    )]
    TicketTypes,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::ticket_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
