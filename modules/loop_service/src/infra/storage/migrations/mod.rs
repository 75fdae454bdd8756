//! Database migrations for the loop service

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_loops::Migration),
            Box::new(m20250301_000003_create_loop_tasks::Migration),
            Box::new(m20250301_000004_create_loop_documents::Migration),
            Box::new(m20250301_000005_create_organizations::Migration),
            Box::new(m20250301_000006_create_user_organizations::Migration),
        ]
    }
}

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn created_at_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

/// Shared with the account system; created here only when absent
mod m20250301_000001_create_users {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_users"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(id_col(Users::Id))
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string()
                                .not_null()
                                .default("agent"),
                        )
                        .col(
                            ColumnDef::new(Users::Suspended)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::LastActive).timestamp_with_time_zone())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        Role,
        Suspended,
        LastActive,
        CreatedAt,
    }
}

mod m20250301_000002_create_loops {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_loops"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Loops::Table)
                        .if_not_exists()
                        .col(id_col(Loops::Id))
                        .col(ColumnDef::new(Loops::Type).string().not_null())
                        .col(ColumnDef::new(Loops::Sale).double())
                        .col(ColumnDef::new(Loops::CreatorId).big_integer().not_null())
                        .col(created_at_col(Loops::CreatedAt))
                        .col(created_at_col(Loops::UpdatedAt))
                        .col(ColumnDef::new(Loops::StartDate).date())
                        .col(ColumnDef::new(Loops::EndDate).date())
                        .col(ColumnDef::new(Loops::Tags).text())
                        .col(
                            ColumnDef::new(Loops::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(ColumnDef::new(Loops::PropertyAddress).string().not_null())
                        .col(ColumnDef::new(Loops::ClientName).string())
                        .col(ColumnDef::new(Loops::ClientEmail).string())
                        .col(ColumnDef::new(Loops::ClientPhone).string())
                        .col(ColumnDef::new(Loops::Notes).text())
                        .col(ColumnDef::new(Loops::Images).json())
                        .col(ColumnDef::new(Loops::Participants).json())
                        .col(
                            ColumnDef::new(Loops::Archived)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Loops::Details).json())
                        .col(
                            ColumnDef::new(Loops::ComplianceStatus)
                                .string()
                                .not_null()
                                .default("none"),
                        )
                        .col(ColumnDef::new(Loops::ComplianceRequestedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(Loops::ComplianceReviewedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(Loops::ComplianceReviewerId).big_integer())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_loops_creator_id")
                        .table(Loops::Table)
                        .col(Loops::CreatorId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_loops_archived_end_date")
                        .table(Loops::Table)
                        .col(Loops::Archived)
                        .col(Loops::EndDate)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Loops::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Loops {
        Table,
        Id,
        Type,
        Sale,
        CreatorId,
        CreatedAt,
        UpdatedAt,
        StartDate,
        EndDate,
        Tags,
        Status,
        PropertyAddress,
        ClientName,
        ClientEmail,
        ClientPhone,
        Notes,
        Images,
        Participants,
        Archived,
        Details,
        ComplianceStatus,
        ComplianceRequestedAt,
        ComplianceReviewedAt,
        ComplianceReviewerId,
    }
}

/// Task rows outlive a deleted loop; no foreign key is declared
mod m20250301_000003_create_loop_tasks {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_loop_tasks"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LoopTasks::Table)
                        .if_not_exists()
                        .col(id_col(LoopTasks::Id))
                        .col(ColumnDef::new(LoopTasks::LoopId).big_integer().not_null())
                        .col(ColumnDef::new(LoopTasks::Title).string().not_null())
                        .col(ColumnDef::new(LoopTasks::DueDate).date())
                        .col(
                            ColumnDef::new(LoopTasks::Completed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(LoopTasks::CompletedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(LoopTasks::CreatedBy).big_integer())
                        .col(created_at_col(LoopTasks::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_loop_tasks_loop_id")
                        .table(LoopTasks::Table)
                        .col(LoopTasks::LoopId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LoopTasks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LoopTasks {
        Table,
        Id,
        LoopId,
        Title,
        DueDate,
        Completed,
        CompletedAt,
        CreatedBy,
        CreatedAt,
    }
}

/// Document rows outlive a deleted loop; no foreign key is declared
mod m20250301_000004_create_loop_documents {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_loop_documents"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LoopDocuments::Table)
                        .if_not_exists()
                        .col(id_col(LoopDocuments::Id))
                        .col(ColumnDef::new(LoopDocuments::LoopId).big_integer().not_null())
                        .col(
                            ColumnDef::new(LoopDocuments::Filename)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(LoopDocuments::OriginalName).string().not_null())
                        .col(ColumnDef::new(LoopDocuments::Size).big_integer())
                        .col(ColumnDef::new(LoopDocuments::MimeType).string())
                        .col(ColumnDef::new(LoopDocuments::UploadedBy).big_integer())
                        .col(created_at_col(LoopDocuments::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_loop_documents_loop_id")
                        .table(LoopDocuments::Table)
                        .col(LoopDocuments::LoopId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LoopDocuments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LoopDocuments {
        Table,
        Id,
        LoopId,
        Filename,
        OriginalName,
        Size,
        MimeType,
        UploadedBy,
        CreatedAt,
    }
}

mod m20250301_000005_create_organizations {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_organizations"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Organizations::Table)
                        .if_not_exists()
                        .col(id_col(Organizations::Id))
                        .col(
                            ColumnDef::new(Organizations::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Organizations::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Organizations::CreatedBy).big_integer().not_null())
                        .col(created_at_col(Organizations::CreatedAt))
                        .col(created_at_col(Organizations::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Organizations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Organizations {
        Table,
        Id,
        Name,
        Description,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000006_create_user_organizations {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_user_organizations"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(UserOrganizations::Table)
                        .if_not_exists()
                        .col(id_col(UserOrganizations::Id))
                        .col(ColumnDef::new(UserOrganizations::UserId).big_integer().not_null())
                        .col(
                            ColumnDef::new(UserOrganizations::OrganizationId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UserOrganizations::AssignedBy).big_integer().not_null())
                        .col(created_at_col(UserOrganizations::AssignedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_organizations_user")
                                .from(UserOrganizations::Table, UserOrganizations::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_organizations_organization")
                                .from(UserOrganizations::Table, UserOrganizations::OrganizationId)
                                .to(Organizations::Table, Organizations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_user_organizations_pair")
                        .table(UserOrganizations::Table)
                        .col(UserOrganizations::UserId)
                        .col(UserOrganizations::OrganizationId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserOrganizations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum UserOrganizations {
        Table,
        Id,
        UserId,
        OrganizationId,
        AssignedBy,
        AssignedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Organizations {
        Table,
        Id,
    }
}
