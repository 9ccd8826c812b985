pub mod eastmoney;
pub mod tencent;
pub mod util;
