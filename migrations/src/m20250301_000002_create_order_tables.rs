use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Orders::Amount)
                            .decimal()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Orders::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::ShippingMethod).string().not_null())
                    .col(ColumnDef::new(Orders::ShippingAddress).text().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::Name).string().not_null())
                    .col(ColumnDef::new(OrderItems::ImageUrl).string().null())
                    .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                    .col(ColumnDef::new(OrderItems::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShippingAddresses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShippingAddresses::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShippingAddresses::OrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShippingAddresses::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ShippingAddresses::FullName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShippingAddresses::Line1).string().not_null())
                    .col(ColumnDef::new(ShippingAddresses::Line2).string().null())
                    .col(ColumnDef::new(ShippingAddresses::City).string().not_null())
                    .col(ColumnDef::new(ShippingAddresses::State).string().null())
                    .col(
                        ColumnDef::new(ShippingAddresses::PostalCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShippingAddresses::CountryCode)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShippingAddresses::Phone).string().null())
                    .col(
                        ColumnDef::new(ShippingAddresses::AddressType)
                            .string()
                            .not_null()
                            .default("both"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shipping_addresses_order_id")
                    .table(ShippingAddresses::Table)
                    .col(ShippingAddresses::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShippingAddresses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    Amount,
    Currency,
    Status,
    ShippingMethod,
    ShippingAddress,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    Name,
    ImageUrl,
    Quantity,
    UnitPrice,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ShippingAddresses {
    Table,
    Id,
    OrderId,
    UserId,
    FullName,
    Line1,
    Line2,
    City,
    State,
    PostalCode,
    CountryCode,
    Phone,
    AddressType,
}
