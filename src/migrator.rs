use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_identity_tables::Migration),
            Box::new(m20240101_000002_create_reference_tables::Migration),
            Box::new(m20240101_000003_create_asset_tables::Migration),
        ]
    }
}

/// Column groups shared by the organization-scoped tables.
mod columns {
    use sea_orm_migration::prelude::*;

    #[derive(DeriveIden)]
    pub(super) enum Audit {
        Id,
        OrganizationId,
        Name,
        Description,
        IsDeleted,
        CreatedBy,
        CreatedAt,
        ModifiedBy,
        ModifiedAt,
    }

    pub(super) fn id() -> ColumnDef {
        ColumnDef::new(Audit::Id)
            .integer()
            .not_null()
            .auto_increment()
            .primary_key()
            .to_owned()
    }

    /// `id, organization_id, name, description` followed by the soft-delete flag and audit stamps.
    pub(super) fn reference_table<T>(table: T, organization_scoped: bool) -> TableCreateStatement
    where
        T: IntoIden + 'static,
    {
        let mut stmt = Table::create();
        stmt.table(table).if_not_exists().col(&mut id());
        if organization_scoped {
            stmt.col(ColumnDef::new(Audit::OrganizationId).integer().not_null());
        }
        stmt.col(ColumnDef::new(Audit::Name).string_len(200).not_null())
            .col(ColumnDef::new(Audit::Description).string_len(1000).null());
        stmt
    }

    pub(super) fn audit_stamps(stmt: &mut TableCreateStatement, created_by_required: bool) {
        let mut created_by = ColumnDef::new(Audit::CreatedBy);
        created_by.uuid();
        if created_by_required {
            created_by.not_null();
        } else {
            created_by.null();
        }

        stmt.col(
            ColumnDef::new(Audit::IsDeleted)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(&mut created_by)
        .col(
            ColumnDef::new(Audit::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new(Audit::ModifiedBy).uuid().null())
        .col(
            ColumnDef::new(Audit::ModifiedAt)
                .timestamp_with_time_zone()
                .null(),
        );
    }

    pub(super) fn org_name_index<T>(name: &str, table: T) -> IndexCreateStatement
    where
        T: IntoIden + 'static,
    {
        Index::create()
            .if_not_exists()
            .name(name)
            .table(table)
            .col(Audit::OrganizationId)
            .col(Audit::Name)
            .to_owned()
    }
}

mod m20240101_000001_create_identity_tables {
    use super::columns::{id, Audit};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_identity_tables"
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
                        .col(&mut id())
                        .col(ColumnDef::new(Organizations::Name).string_len(200).not_null())
                        .col(
                            ColumnDef::new(Organizations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(IdentityRoles::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(
                            ColumnDef::new(IdentityRoles::Name)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(IdentityRoles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ManageUserRoles::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(Audit::OrganizationId).integer().not_null())
                        .col(ColumnDef::new(Audit::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Audit::Description).string_len(1000).null())
                        .col(
                            ColumnDef::new(Audit::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Audit::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Audit::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Audit::ModifiedBy).uuid().null())
                        .col(
                            ColumnDef::new(Audit::ModifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_manage_user_roles_organization")
                                .from(ManageUserRoles::Table, Audit::OrganizationId)
                                .to(Organizations::Table, Organizations::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ManageUserRoleDetails::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(
                            ColumnDef::new(ManageUserRoleDetails::ManageUserRoleId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ManageUserRoleDetails::IdentityRoleId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ManageUserRoleDetails::IsAllowed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_manage_user_role_details_role")
                                .from(
                                    ManageUserRoleDetails::Table,
                                    ManageUserRoleDetails::ManageUserRoleId,
                                )
                                .to(ManageUserRoles::Table, ManageUserRoles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_manage_user_role_details_identity_role")
                                .from(
                                    ManageUserRoleDetails::Table,
                                    ManageUserRoleDetails::IdentityRoleId,
                                )
                                .to(IdentityRoles::Table, IdentityRoles::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Users::OrganizationId).integer().not_null())
                        .col(ColumnDef::new(Users::FullName).string_len(200).not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Phone).string_len(50).null())
                        .col(ColumnDef::new(Users::EmployeeCode).string_len(50).null())
                        .col(ColumnDef::new(Users::PasswordHash).text().null())
                        .col(
                            ColumnDef::new(Users::EmailConfirmed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::LoginEnabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsSelfRegistered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsOrgAdmin)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::DepartmentId).integer().null())
                        .col(ColumnDef::new(Users::SubDepartmentId).integer().null())
                        .col(ColumnDef::new(Users::DesignationId).integer().null())
                        .col(ColumnDef::new(Users::SiteId).integer().null())
                        .col(ColumnDef::new(Users::ManageUserRoleId).integer().null())
                        .col(
                            ColumnDef::new(Users::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Users::ModifiedBy).uuid().null())
                        .col(
                            ColumnDef::new(Users::ModifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_organization")
                                .from(Users::Table, Users::OrganizationId)
                                .to(Organizations::Table, Organizations::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_manage_user_role")
                                .from(Users::Table, Users::ManageUserRoleId)
                                .to(ManageUserRoles::Table, ManageUserRoles::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_organization_id")
                        .table(Users::Table)
                        .col(Users::OrganizationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserIdentityRoles::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(UserIdentityRoles::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(UserIdentityRoles::IdentityRoleId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserIdentityRoles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_identity_roles_user")
                                .from(UserIdentityRoles::Table, UserIdentityRoles::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_identity_roles_identity_role")
                                .from(UserIdentityRoles::Table, UserIdentityRoles::IdentityRoleId)
                                .to(IdentityRoles::Table, IdentityRoles::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_user_identity_roles_unique")
                        .table(UserIdentityRoles::Table)
                        .col(UserIdentityRoles::UserId)
                        .col(UserIdentityRoles::IdentityRoleId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EmailVerifications::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(EmailVerifications::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(EmailVerifications::Email)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmailVerifications::Code).string_len(128).not_null())
                        .col(
                            ColumnDef::new(EmailVerifications::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EmailVerifications::ConsumedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(EmailVerifications::FailedAttempts)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(EmailVerifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_email_verifications_user")
                                .from(EmailVerifications::Table, EmailVerifications::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LoginHistories::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(LoginHistories::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(LoginHistories::OrganizationId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LoginHistories::TokenId).string_len(64).not_null())
                        .col(ColumnDef::new(LoginHistories::IpAddress).string_len(64).null())
                        .col(ColumnDef::new(LoginHistories::UserAgent).string_len(512).null())
                        .col(
                            ColumnDef::new(LoginHistories::LoginAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoginHistories::LogoutAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_login_histories_user")
                                .from(LoginHistories::Table, LoginHistories::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_login_histories_token_id")
                        .table(LoginHistories::Table)
                        .col(LoginHistories::TokenId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LoginHistories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(EmailVerifications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UserIdentityRoles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ManageUserRoleDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ManageUserRoles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(IdentityRoles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Organizations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Organizations {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum IdentityRoles {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ManageUserRoles {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum ManageUserRoleDetails {
        Table,
        ManageUserRoleId,
        IdentityRoleId,
        IsAllowed,
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        OrganizationId,
        FullName,
        Email,
        Phone,
        EmployeeCode,
        PasswordHash,
        EmailConfirmed,
        LoginEnabled,
        IsSelfRegistered,
        IsOrgAdmin,
        DepartmentId,
        SubDepartmentId,
        DesignationId,
        SiteId,
        ManageUserRoleId,
        IsDeleted,
        CreatedBy,
        CreatedAt,
        ModifiedBy,
        ModifiedAt,
    }

    #[derive(DeriveIden)]
    enum UserIdentityRoles {
        Table,
        UserId,
        IdentityRoleId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum EmailVerifications {
        Table,
        UserId,
        Email,
        Code,
        ExpiresAt,
        ConsumedAt,
        FailedAttempts,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum LoginHistories {
        Table,
        UserId,
        OrganizationId,
        TokenId,
        IpAddress,
        UserAgent,
        LoginAt,
        LogoutAt,
    }
}

mod m20240101_000002_create_reference_tables {
    use super::columns::{audit_stamps, org_name_index, reference_table, Audit};
    use super::m20240101_000001_create_identity_tables::Organizations;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_reference_tables"
        }
    }

    fn organization_fk(name: &str, table: impl IntoIden + 'static) -> ForeignKeyCreateStatement {
        ForeignKey::create()
            .name(name)
            .from(table, Audit::OrganizationId)
            .to(Organizations::Table, Organizations::Id)
            .to_owned()
    }

    /// Plain organization-scoped table: name, description, audit columns.
    async fn create_flat(
        manager: &SchemaManager<'_>,
        table: impl IntoIden + Clone + 'static,
        fk_name: &str,
        index_name: &str,
    ) -> Result<(), DbErr> {
        let mut stmt = reference_table(table.clone(), true);
        audit_stamps(&mut stmt, true);
        stmt.foreign_key(&mut organization_fk(fk_name, table.clone()));
        manager.create_table(stmt).await?;
        manager.create_index(org_name_index(index_name, table)).await
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut industries = reference_table(Industries::Table, false);
            audit_stamps(&mut industries, true);
            manager.create_table(industries).await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_industries_name")
                        .table(Industries::Table)
                        .col(Audit::Name)
                        .to_owned(),
                )
                .await?;

            let mut companies = reference_table(Companies::Table, true);
            companies
                .col(ColumnDef::new(Companies::IndustryId).integer().null())
                .col(ColumnDef::new(Companies::Address).string_len(500).null())
                .col(ColumnDef::new(Companies::Email).string_len(255).null())
                .col(ColumnDef::new(Companies::Phone).string_len(50).null());
            audit_stamps(&mut companies, true);
            companies
                .foreign_key(&mut organization_fk(
                    "fk_companies_organization",
                    Companies::Table,
                ))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_companies_industry")
                        .from(Companies::Table, Companies::IndustryId)
                        .to(Industries::Table, Industries::Id),
                );
            manager.create_table(companies).await?;
            manager
                .create_index(org_name_index("idx_companies_org_name", Companies::Table))
                .await?;

            create_flat(manager, Cities::Table, "fk_cities_organization", "idx_cities_org_name")
                .await?;

            let mut sites = reference_table(Sites::Table, true);
            sites
                .col(ColumnDef::new(Sites::CityId).integer().null())
                .col(ColumnDef::new(Sites::Address).string_len(500).null());
            audit_stamps(&mut sites, true);
            sites
                .foreign_key(&mut organization_fk("fk_sites_organization", Sites::Table))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sites_city")
                        .from(Sites::Table, Sites::CityId)
                        .to(Cities::Table, Cities::Id),
                );
            manager.create_table(sites).await?;
            manager
                .create_index(org_name_index("idx_sites_org_name", Sites::Table))
                .await?;

            let mut areas = reference_table(Areas::Table, true);
            areas.col(ColumnDef::new(Areas::SiteId).integer().not_null());
            audit_stamps(&mut areas, true);
            areas
                .foreign_key(&mut organization_fk("fk_areas_organization", Areas::Table))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_areas_site")
                        .from(Areas::Table, Areas::SiteId)
                        .to(Sites::Table, Sites::Id),
                );
            manager.create_table(areas).await?;
            manager
                .create_index(org_name_index("idx_areas_org_name", Areas::Table))
                .await?;

            create_flat(
                manager,
                Categories::Table,
                "fk_categories_organization",
                "idx_categories_org_name",
            )
            .await?;

            let mut sub_categories = reference_table(SubCategories::Table, true);
            sub_categories.col(ColumnDef::new(SubCategories::CategoryId).integer().not_null());
            audit_stamps(&mut sub_categories, true);
            sub_categories
                .foreign_key(&mut organization_fk(
                    "fk_sub_categories_organization",
                    SubCategories::Table,
                ))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sub_categories_category")
                        .from(SubCategories::Table, SubCategories::CategoryId)
                        .to(Categories::Table, Categories::Id),
                );
            manager.create_table(sub_categories).await?;
            manager
                .create_index(org_name_index(
                    "idx_sub_categories_org_name",
                    SubCategories::Table,
                ))
                .await?;

            let mut suppliers = reference_table(Suppliers::Table, true);
            suppliers
                .col(ColumnDef::new(Suppliers::ContactPerson).string_len(200).null())
                .col(ColumnDef::new(Suppliers::Email).string_len(255).null())
                .col(ColumnDef::new(Suppliers::Phone).string_len(50).null())
                .col(ColumnDef::new(Suppliers::Address).string_len(500).null())
                .col(ColumnDef::new(Suppliers::DocumentPath).string_len(1024).null());
            audit_stamps(&mut suppliers, true);
            suppliers.foreign_key(&mut organization_fk(
                "fk_suppliers_organization",
                Suppliers::Table,
            ));
            manager.create_table(suppliers).await?;
            manager
                .create_index(org_name_index("idx_suppliers_org_name", Suppliers::Table))
                .await?;

            create_flat(
                manager,
                Departments::Table,
                "fk_departments_organization",
                "idx_departments_org_name",
            )
            .await?;

            let mut sub_departments = reference_table(SubDepartments::Table, true);
            sub_departments.col(
                ColumnDef::new(SubDepartments::DepartmentId)
                    .integer()
                    .not_null(),
            );
            audit_stamps(&mut sub_departments, true);
            sub_departments
                .foreign_key(&mut organization_fk(
                    "fk_sub_departments_organization",
                    SubDepartments::Table,
                ))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sub_departments_department")
                        .from(SubDepartments::Table, SubDepartments::DepartmentId)
                        .to(Departments::Table, Departments::Id),
                );
            manager.create_table(sub_departments).await?;
            manager
                .create_index(org_name_index(
                    "idx_sub_departments_org_name",
                    SubDepartments::Table,
                ))
                .await?;

            create_flat(
                manager,
                Designations::Table,
                "fk_designations_organization",
                "idx_designations_org_name",
            )
            .await?;

            let mut statuses = reference_table(AssetStatuses::Table, true);
            statuses.col(ColumnDef::new(AssetStatuses::Kind).string_len(32).null());
            audit_stamps(&mut statuses, false);
            statuses.foreign_key(&mut organization_fk(
                "fk_asset_statuses_organization",
                AssetStatuses::Table,
            ));
            manager.create_table(statuses).await?;
            manager
                .create_index(org_name_index(
                    "idx_asset_statuses_org_name",
                    AssetStatuses::Table,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let tables: Vec<DynIden> = vec![
                AssetStatuses::Table.into_iden(),
                Designations::Table.into_iden(),
                SubDepartments::Table.into_iden(),
                Departments::Table.into_iden(),
                Suppliers::Table.into_iden(),
                SubCategories::Table.into_iden(),
                Categories::Table.into_iden(),
                Areas::Table.into_iden(),
                Sites::Table.into_iden(),
                Cities::Table.into_iden(),
                Companies::Table.into_iden(),
                Industries::Table.into_iden(),
            ];
            for table in tables {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden, Clone)]
    pub(super) enum Industries {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Companies {
        Table,
        IndustryId,
        Address,
        Email,
        Phone,
    }

    #[derive(DeriveIden, Clone)]
    pub(super) enum Cities {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    pub(super) enum Sites {
        Table,
        Id,
        CityId,
        Address,
    }

    #[derive(DeriveIden)]
    pub(super) enum Areas {
        Table,
        Id,
        SiteId,
    }

    #[derive(DeriveIden, Clone)]
    pub(super) enum Categories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    pub(super) enum SubCategories {
        Table,
        Id,
        CategoryId,
    }

    #[derive(DeriveIden)]
    pub(super) enum Suppliers {
        Table,
        Id,
        ContactPerson,
        Email,
        Phone,
        Address,
        DocumentPath,
    }

    #[derive(DeriveIden, Clone)]
    pub(super) enum Departments {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    pub(super) enum SubDepartments {
        Table,
        Id,
        DepartmentId,
    }

    #[derive(DeriveIden, Clone)]
    enum Designations {
        Table,
    }

    #[derive(DeriveIden)]
    pub(super) enum AssetStatuses {
        Table,
        Id,
        Kind,
    }
}

mod m20240101_000003_create_asset_tables {
    use super::columns::id;
    use super::m20240101_000001_create_identity_tables::{Organizations, Users};
    use super::m20240101_000002_create_reference_tables::{
        AssetStatuses, Categories, Sites,
    };
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_asset_tables"
        }
    }

    // SQLite rejects decimal precision above 16.
    fn money(col: impl IntoIden) -> ColumnDef {
        ColumnDef::new(col).decimal_len(16, 2).to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(Assets::OrganizationId).integer().not_null())
                        .col(ColumnDef::new(Assets::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Assets::Brand).string_len(200).null())
                        .col(ColumnDef::new(Assets::Model).string_len(200).null())
                        .col(ColumnDef::new(Assets::SerialNumber).string_len(200).null())
                        .col(
                            ColumnDef::new(Assets::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(money(Assets::UnitPrice).not_null().default(0))
                        .col(ColumnDef::new(Assets::CategoryId).integer().not_null())
                        .col(ColumnDef::new(Assets::SubCategoryId).integer().null())
                        .col(ColumnDef::new(Assets::SupplierId).integer().null())
                        .col(ColumnDef::new(Assets::SiteId).integer().not_null())
                        .col(ColumnDef::new(Assets::AreaId).integer().null())
                        .col(ColumnDef::new(Assets::DepartmentId).integer().null())
                        .col(ColumnDef::new(Assets::SubDepartmentId).integer().null())
                        .col(ColumnDef::new(Assets::AssetStatusId).integer().not_null())
                        .col(
                            ColumnDef::new(Assets::IsDepreciable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(money(Assets::DepreciableCost).null())
                        .col(money(Assets::SalvageValue).null())
                        .col(ColumnDef::new(Assets::DepreciationMonths).integer().null())
                        .col(
                            ColumnDef::new(Assets::DepreciationMethod)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(Assets::AcquisitionDate).date().null())
                        .col(ColumnDef::new(Assets::ImagePath).string_len(1024).null())
                        .col(ColumnDef::new(Assets::DeliveryNotePath).string_len(1024).null())
                        .col(ColumnDef::new(Assets::ReceiptPath).string_len(1024).null())
                        .col(ColumnDef::new(Assets::InvoicePath).string_len(1024).null())
                        .col(
                            ColumnDef::new(Assets::IsDisposed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Assets::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Assets::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Assets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Assets::ModifiedBy).uuid().null())
                        .col(
                            ColumnDef::new(Assets::ModifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_organization")
                                .from(Assets::Table, Assets::OrganizationId)
                                .to(Organizations::Table, Organizations::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_category")
                                .from(Assets::Table, Assets::CategoryId)
                                .to(Categories::Table, Categories::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_site")
                                .from(Assets::Table, Assets::SiteId)
                                .to(Sites::Table, Sites::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_asset_status")
                                .from(Assets::Table, Assets::AssetStatusId)
                                .to(AssetStatuses::Table, AssetStatuses::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assets_organization_id")
                        .table(Assets::Table)
                        .col(Assets::OrganizationId)
                        .col(Assets::IsDeleted)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AssetAssignments::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(AssetAssignments::AssetId).integer().not_null())
                        .col(
                            ColumnDef::new(AssetAssignments::OrganizationId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssetAssignments::AssignToType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetAssignments::UserId).uuid().null())
                        .col(ColumnDef::new(AssetAssignments::SiteId).integer().null())
                        .col(ColumnDef::new(AssetAssignments::AreaId).integer().null())
                        .col(ColumnDef::new(AssetAssignments::AssignedDate).date().not_null())
                        .col(ColumnDef::new(AssetAssignments::DueDate).date().null())
                        .col(ColumnDef::new(AssetAssignments::Note).string_len(1000).null())
                        .col(
                            ColumnDef::new(AssetAssignments::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(AssetAssignments::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(AssetAssignments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssetAssignments::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_assignments_asset")
                                .from(AssetAssignments::Table, AssetAssignments::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_assignments_user")
                                .from(AssetAssignments::Table, AssetAssignments::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_assignments_asset_active")
                        .table(AssetAssignments::Table)
                        .col(AssetAssignments::AssetId)
                        .col(AssetAssignments::IsActive)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AssetHistories::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(ColumnDef::new(AssetHistories::AssetId).integer().not_null())
                        .col(
                            ColumnDef::new(AssetHistories::OrganizationId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetHistories::Event).string_len(32).not_null())
                        .col(
                            ColumnDef::new(AssetHistories::AssignToType)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(AssetHistories::UserId).uuid().null())
                        .col(ColumnDef::new(AssetHistories::SiteId).integer().null())
                        .col(ColumnDef::new(AssetHistories::AreaId).integer().null())
                        .col(ColumnDef::new(AssetHistories::Note).string_len(1000).null())
                        .col(ColumnDef::new(AssetHistories::PerformedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(AssetHistories::PerformedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_histories_asset")
                                .from(AssetHistories::Table, AssetHistories::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_histories_asset_id")
                        .table(AssetHistories::Table)
                        .col(AssetHistories::AssetId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AssetDisposals::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(
                            ColumnDef::new(AssetDisposals::AssetId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(AssetDisposals::OrganizationId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssetDisposals::DisposalMethod)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetDisposals::DisposalDate).date().not_null())
                        .col(
                            ColumnDef::new(AssetDisposals::DocumentPath)
                                .string_len(1024)
                                .null(),
                        )
                        .col(ColumnDef::new(AssetDisposals::Comment).string_len(1000).null())
                        .col(ColumnDef::new(AssetDisposals::DisposedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(AssetDisposals::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_disposals_asset")
                                .from(AssetDisposals::Table, AssetDisposals::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AssetRequests::Table)
                        .if_not_exists()
                        .col(&mut id())
                        .col(
                            ColumnDef::new(AssetRequests::OrganizationId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetRequests::AssetId).integer().not_null())
                        .col(
                            ColumnDef::new(AssetRequests::RequestType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetRequests::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(AssetRequests::RequiredLevels)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(AssetRequests::ApprovedLevels)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(AssetRequests::Level1ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(AssetRequests::Level1ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(AssetRequests::Level2ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(AssetRequests::Level2ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(AssetRequests::Level3ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(AssetRequests::Level3ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AssetRequests::AssignToType)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(AssetRequests::UserId).uuid().null())
                        .col(ColumnDef::new(AssetRequests::SiteId).integer().null())
                        .col(ColumnDef::new(AssetRequests::AreaId).integer().null())
                        .col(ColumnDef::new(AssetRequests::TransferDate).date().null())
                        .col(ColumnDef::new(AssetRequests::DueDate).date().null())
                        .col(ColumnDef::new(AssetRequests::Note).string_len(1000).null())
                        .col(
                            ColumnDef::new(AssetRequests::DisposalMethod)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(AssetRequests::DisposalDate).date().null())
                        .col(
                            ColumnDef::new(AssetRequests::DocumentPath)
                                .string_len(1024)
                                .null(),
                        )
                        .col(ColumnDef::new(AssetRequests::Comment).string_len(1000).null())
                        .col(ColumnDef::new(AssetRequests::RequestedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(AssetRequests::RequestedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AssetRequests::DecidedBy).uuid().null())
                        .col(
                            ColumnDef::new(AssetRequests::DecidedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AssetRequests::RejectionReason)
                                .string_len(1000)
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_requests_asset")
                                .from(AssetRequests::Table, AssetRequests::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_requests_org_status")
                        .table(AssetRequests::Table)
                        .col(AssetRequests::OrganizationId)
                        .col(AssetRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AssetRequests::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AssetDisposals::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AssetHistories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AssetAssignments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Assets {
        Table,
        Id,
        OrganizationId,
        Name,
        Brand,
        Model,
        SerialNumber,
        Quantity,
        UnitPrice,
        CategoryId,
        SubCategoryId,
        SupplierId,
        SiteId,
        AreaId,
        DepartmentId,
        SubDepartmentId,
        AssetStatusId,
        IsDepreciable,
        DepreciableCost,
        SalvageValue,
        DepreciationMonths,
        DepreciationMethod,
        AcquisitionDate,
        ImagePath,
        DeliveryNotePath,
        ReceiptPath,
        InvoicePath,
        IsDisposed,
        IsDeleted,
        CreatedBy,
        CreatedAt,
        ModifiedBy,
        ModifiedAt,
    }

    #[derive(DeriveIden)]
    enum AssetAssignments {
        Table,
        AssetId,
        OrganizationId,
        AssignToType,
        UserId,
        SiteId,
        AreaId,
        AssignedDate,
        DueDate,
        Note,
        IsActive,
        CreatedBy,
        CreatedAt,
        ClosedAt,
    }

    #[derive(DeriveIden)]
    enum AssetHistories {
        Table,
        AssetId,
        OrganizationId,
        Event,
        AssignToType,
        UserId,
        SiteId,
        AreaId,
        Note,
        PerformedBy,
        PerformedAt,
    }

    #[derive(DeriveIden)]
    enum AssetDisposals {
        Table,
        AssetId,
        OrganizationId,
        DisposalMethod,
        DisposalDate,
        DocumentPath,
        Comment,
        DisposedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum AssetRequests {
        Table,
        OrganizationId,
        AssetId,
        RequestType,
        Status,
        RequiredLevels,
        ApprovedLevels,
        #[sea_orm(iden = "level1_approved_by")]
        Level1ApprovedBy,
        #[sea_orm(iden = "level1_approved_at")]
        Level1ApprovedAt,
        #[sea_orm(iden = "level2_approved_by")]
        Level2ApprovedBy,
        #[sea_orm(iden = "level2_approved_at")]
        Level2ApprovedAt,
        #[sea_orm(iden = "level3_approved_by")]
        Level3ApprovedBy,
        #[sea_orm(iden = "level3_approved_at")]
        Level3ApprovedAt,
        AssignToType,
        UserId,
        SiteId,
        AreaId,
        TransferDate,
        DueDate,
        Note,
        DisposalMethod,
        DisposalDate,
        DocumentPath,
        Comment,
        RequestedBy,
        RequestedAt,
        DecidedBy,
        DecidedAt,
        RejectionReason,
    }
}

/// Connects to `db_url` and applies every pending migration.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(4)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}

/// Rolls back the most recent `steps` migrations.
pub async fn rollback_migration(db_url: &str, steps: u32) -> Result<()> {
    let db = Database::connect(db_url).await?;
    info!(steps, "Rolling back database migrations");
    Migrator::down(&db, Some(steps)).await?;
    Ok(())
}
