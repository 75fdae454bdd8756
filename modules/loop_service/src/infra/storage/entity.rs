//! SeaORM entities for database tables

/// Transaction records
pub mod loops {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "loops")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        /// Transaction category
        pub r#type: String,

        pub sale: Option<f64>,

        /// Owning user
        pub creator_id: i64,

        pub created_at: DateTimeUtc,

        pub updated_at: DateTimeUtc,

        pub start_date: Option<Date>,

        pub end_date: Option<Date>,

        pub tags: Option<String>,

        /// API status value (`active`, `closing`, ...)
        pub status: String,

        pub property_address: String,

        pub client_name: Option<String>,

        pub client_email: Option<String>,

        pub client_phone: Option<String>,

        pub notes: Option<String>,

        /// Image list as JSON array
        pub images: Option<Json>,

        /// Participant list as JSON array
        pub participants: Option<Json>,

        pub archived: bool,

        /// Open-ended detail map as JSON object
        pub details: Option<Json>,

        pub compliance_status: String,

        pub compliance_requested_at: Option<DateTimeUtc>,

        pub compliance_reviewed_at: Option<DateTimeUtc>,

        pub compliance_reviewer_id: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        /// Creator of the loop
        #[sea_orm(
            belongs_to = "super::users::Entity",
            from = "Column::CreatorId",
            to = "super::users::Column::Id"
        )]
        Creator,
    }

    impl Related<super::users::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Creator.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// User directory (owned by the account system, read here)
pub mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub name: String,

        pub email: String,

        /// `admin` or a non-admin role
        pub role: String,

        pub suspended: bool,

        pub last_active: Option<DateTimeUtc>,

        pub created_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Loop checklist items
pub mod tasks {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "loop_tasks")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub loop_id: i64,

        pub title: String,

        pub due_date: Option<Date>,

        pub completed: bool,

        pub completed_at: Option<DateTimeUtc>,

        pub created_by: Option<i64>,

        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Uploaded document metadata
pub mod documents {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "loop_documents")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub loop_id: i64,

        /// Stored (generated) file name
        pub filename: String,

        pub original_name: String,

        pub size: Option<i64>,

        pub mime_type: Option<String>,

        pub uploaded_by: Option<i64>,

        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Named user groups
pub mod organizations {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "organizations")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        #[sea_orm(unique)]
        pub name: String,

        pub description: String,

        pub created_by: i64,

        pub created_at: DateTimeUtc,

        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::users::Entity",
            from = "Column::CreatedBy",
            to = "super::users::Column::Id"
        )]
        Creator,
    }

    impl Related<super::users::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Creator.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// User-to-organization assignments; (user_id, organization_id) is unique
pub mod memberships {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "user_organizations")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub user_id: i64,

        pub organization_id: i64,

        pub assigned_by: i64,

        pub assigned_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        /// Assigned user
        #[sea_orm(
            belongs_to = "super::users::Entity",
            from = "Column::UserId",
            to = "super::users::Column::Id"
        )]
        User,
        #[sea_orm(
            belongs_to = "super::organizations::Entity",
            from = "Column::OrganizationId",
            to = "super::organizations::Column::Id"
        )]
        Organization,
    }

    impl Related<super::users::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl Related<super::organizations::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Organization.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
