use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(User::HashedPassword).string().not_null())
                    .col(
                        ColumnDef::new(User::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(User::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // API token 表
        manager
            .create_table(
                Table::create()
                    .table(ApiToken::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiToken::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiToken::Token).string().not_null().unique_key())
                    .col(ColumnDef::new(ApiToken::State).integer().not_null().default(1))
                    .col(ColumnDef::new(ApiToken::Created).big_integer().not_null())
                    .col(
                        ColumnDef::new(ApiToken::Till)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ApiToken::Description).string().null())
                    .to_owned(),
            )
            .await?;

        // 认证凭据包
        manager
            .create_table(
                Table::create()
                    .table(Authbundle::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Authbundle::AuthbundleId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Authbundle::ServiceType).string().not_null())
                    .col(ColumnDef::new(Authbundle::AuthType).string().not_null())
                    .col(ColumnDef::new(Authbundle::Username).string().null())
                    .col(ColumnDef::new(Authbundle::Password).string().null())
                    .col(ColumnDef::new(Authbundle::Keyname).string().null())
                    .col(ColumnDef::new(Authbundle::Keydata).blob().null())
                    .col(ColumnDef::new(Authbundle::Description).string().null())
                    .to_owned(),
            )
            .await?;

        // CA 文件元数据（文件内容保存在磁盘上）
        manager
            .create_table(
                Table::create()
                    .table(CaFile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CaFile::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(CaFile::Description).string().null())
                    .to_owned(),
            )
            .await?;

        // 单行设置表
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Settings::Id).integer().not_null().primary_key())
                    .col(
                        ColumnDef::new(Settings::ApiAuthentication)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Settings::Gcloud)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CaFile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Authbundle::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiToken::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Username,
    HashedPassword,
    IsActive,
    IsAdmin,
}

#[derive(DeriveIden)]
enum ApiToken {
    #[sea_orm(iden = "api_tokens")]
    Table,
    Id,
    Token,
    State,
    Created,
    Till,
    Description,
}

#[derive(DeriveIden)]
enum Authbundle {
    #[sea_orm(iden = "authbundles")]
    Table,
    AuthbundleId,
    ServiceType,
    AuthType,
    Username,
    Password,
    Keyname,
    Keydata,
    Description,
}

#[derive(DeriveIden)]
enum CaFile {
    #[sea_orm(iden = "ca_files")]
    Table,
    Id,
    Description,
}

#[derive(DeriveIden)]
enum Settings {
    #[sea_orm(iden = "settings")]
    Table,
    Id,
    ApiAuthentication,
    Gcloud,
}
