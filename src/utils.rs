use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// 当前时间，精度截到秒（盘上只存秒级时间戳）
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// 生成一个随机唯一 ID
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}
