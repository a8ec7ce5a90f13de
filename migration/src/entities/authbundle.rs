use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "authbundles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub authbundle_id: String,
    pub service_type: String,
    pub auth_type: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keyname: Option<String>,
    pub keydata: Option<Vec<u8>>,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
