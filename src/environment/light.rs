//! 光照模型
//!
//! 体素光照值为 0..=15 的整数，白天与夜晚分两个通道存储，
//! 按昼夜比例混合后再经查找表解码为 0..=255 的亮度。

/// 最大人工光照等级
pub const LIGHT_MAX: u8 = 14;
/// 阳光直射等级
pub const LIGHT_SUN: u8 = 15;

/// 昼夜比例的满值（全白天）
pub const DAY_NIGHT_RATIO_MAX: u32 = 1000;

/// 光照等级到亮度的查找表（伽马校正）
const LIGHT_LUT: [u8; LIGHT_MAX as usize + 1] =
    [8, 11, 14, 18, 22, 29, 37, 47, 60, 76, 97, 123, 157, 200, 255];

/// 某个体素位置的日/夜光照通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightBank {
    pub day: u8,
    pub night: u8,
}

impl LightBank {
    pub fn new(day: u8, night: u8) -> Self {
        Self { day, night }
    }

    /// 按昼夜比例混合两个通道
    pub fn blend(&self, day_night_ratio: u32) -> u8 {
        blend_light(day_night_ratio, self.day, self.night)
    }
}

/// 按昼夜比例（0..=1000）混合白天与夜晚光照
pub fn blend_light(day_night_ratio: u32, light_day: u8, light_night: u8) -> u8 {
    let ratio = day_night_ratio.min(DAY_NIGHT_RATIO_MAX);
    let l = (ratio * u32::from(light_day) + (DAY_NIGHT_RATIO_MAX - ratio) * u32::from(light_night))
        / DAY_NIGHT_RATIO_MAX;
    l.min(u32::from(LIGHT_SUN)) as u8
}

/// 光照等级解码为亮度，超过 `LIGHT_MAX` 的值按 `LIGHT_MAX` 处理
pub fn decode_light(light: u8) -> u8 {
    LIGHT_LUT[light.min(LIGHT_MAX) as usize]
}
