use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// VIP 等级, 序数可比较: NORMAL=0 < VIP=1 < SVIP=2
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
pub enum VipLevel {
    #[sea_orm(string_value = "NORMAL")]
    #[serde(rename = "NORMAL")]
    Normal,
    #[sea_orm(string_value = "VIP")]
    #[serde(rename = "VIP")]
    Vip,
    #[sea_orm(string_value = "SVIP")]
    #[serde(rename = "SVIP")]
    Svip,
}

impl VipLevel {
    /// 合并与配额判定使用的序数
    pub fn rank(&self) -> u8 {
        match self {
            VipLevel::Normal => 0,
            VipLevel::Vip => 1,
            VipLevel::Svip => 2,
        }
    }
}

impl std::fmt::Display for VipLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VipLevel::Normal => write!(f, "NORMAL"),
            VipLevel::Vip => write!(f, "VIP"),
            VipLevel::Svip => write!(f, "SVIP"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub openid: Option<String>,
    pub unionid: Option<String>,
    pub phone: Option<String>,
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
    pub vip_level: VipLevel,
    pub vip_expire_at: Option<DateTime<Utc>>,
    pub points_balance: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vip_level_rank_ordering() {
        assert!(VipLevel::Normal.rank() < VipLevel::Vip.rank());
        assert!(VipLevel::Vip.rank() < VipLevel::Svip.rank());
    }
}
