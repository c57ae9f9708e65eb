use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // users: openid 与 phone 均可空, 非空时唯一 (部分唯一索引)
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Openid).string_len(100))
                    .col(ColumnDef::new(Users::Unionid).string_len(100))
                    .col(ColumnDef::new(Users::Phone).string_len(20))
                    .col(ColumnDef::new(Users::NickName).string_len(100))
                    .col(ColumnDef::new(Users::AvatarUrl).text())
                    .col(
                        ColumnDef::new(Users::VipLevel)
                            .string_len(16)
                            .not_null()
                            .default("NORMAL"),
                    )
                    .col(ColumnDef::new(Users::VipExpireAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::PointsBalance)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_openid")
                    .table(Users::Table)
                    .col(Users::Openid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_phone")
                    .table(Users::Table)
                    .col(Users::Phone)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // generations: 任务记录, 永不删除 (配额统计依赖历史行)
        manager
            .create_table(
                Table::create()
                    .table(Generations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Generations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Generations::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Generations::JobId).string_len(100))
                    .col(ColumnDef::new(Generations::Prompt).text().not_null())
                    .col(ColumnDef::new(Generations::ImageUrl).text())
                    .col(ColumnDef::new(Generations::ThumbnailUrl).text())
                    .col(
                        ColumnDef::new(Generations::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Generations::Params).json_binary())
                    .col(ColumnDef::new(Generations::ErrorMessage).text())
                    .col(
                        ColumnDef::new(Generations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Generations::CompletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_generations_user_id")
                            .from(Generations::Table, Generations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_generations_job_id")
                    .table(Generations::Table)
                    .col(Generations::JobId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_generations_user_created")
                    .table(Generations::Table)
                    .col(Generations::UserId)
                    .col(Generations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // characters / character_photos: 锁脸参考图的读取来源
        manager
            .create_table(
                Table::create()
                    .table(Characters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Characters::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Characters::Uuid)
                            .string_len(36)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Characters::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Characters::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Characters::Description).text())
                    .col(
                        ColumnDef::new(Characters::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Characters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_characters_user_id")
                            .from(Characters::Table, Characters::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_characters_user_id")
                    .table(Characters::Table)
                    .col(Characters::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CharacterPhotos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CharacterPhotos::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CharacterPhotos::Uuid)
                            .string_len(36)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(CharacterPhotos::CharacterId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CharacterPhotos::ThumbnailUrl).text().not_null())
                    .col(ColumnDef::new(CharacterPhotos::OriginalUrl).text().not_null())
                    .col(
                        ColumnDef::new(CharacterPhotos::MimeType)
                            .string_len(50)
                            .not_null()
                            .default("image/jpeg"),
                    )
                    .col(
                        ColumnDef::new(CharacterPhotos::ThumbnailSize)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CharacterPhotos::OriginalSize)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CharacterPhotos::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_character_photos_character_id")
                            .from(CharacterPhotos::Table, CharacterPhotos::CharacterId)
                            .to(Characters::Table, Characters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_character_photos_character_id")
                    .table(CharacterPhotos::Table)
                    .col(CharacterPhotos::CharacterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CharacterPhotos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Characters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Generations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Openid,
    Unionid,
    Phone,
    NickName,
    AvatarUrl,
    VipLevel,
    VipExpireAt,
    PointsBalance,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Generations {
    Table,
    Id,
    UserId,
    JobId,
    Prompt,
    ImageUrl,
    ThumbnailUrl,
    Status,
    Params,
    ErrorMessage,
    CreatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Characters {
    Table,
    Id,
    Uuid,
    UserId,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CharacterPhotos {
    Table,
    Id,
    Uuid,
    CharacterId,
    ThumbnailUrl,
    OriginalUrl,
    MimeType,
    ThumbnailSize,
    OriginalSize,
    CreatedAt,
}
