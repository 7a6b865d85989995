use crudkit_query::sea::FilterableEntity;
use sea_orm::entity::prelude::*;

/// `(username, name)` is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    pub name: String,
    pub price: f64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::Username",
        to = "super::user::Column::Username",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl FilterableEntity for Entity {
    fn resolve_field(name: &str) -> Option<Column> {
        match name {
            "id" => Some(Column::Id),
            "username" => Some(Column::Username),
            "name" => Some(Column::Name),
            "price" => Some(Column::Price),
            "createdAt" => Some(Column::CreatedAt),
            "updatedAt" => Some(Column::UpdatedAt),
            _ => None,
        }
    }
}
