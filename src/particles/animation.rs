//! 贴图动画描述

use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};

/// 贴图动画
///
/// 长度为负数表示"自动"：生成粒子时根据粒子寿命推导，
/// 使动画在粒子生命周期内恰好播放 `-length` 遍。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TileAnimation {
    #[default]
    None,
    /// 竖向排列的帧，帧高由宽高比决定
    VerticalFrames {
        aspect_w: u16,
        aspect_h: u16,
        /// 整个循环的时长（秒）
        length: f32,
    },
    /// 二维帧表，按行优先顺序播放
    Sheet2D {
        frames_w: u8,
        frames_h: u8,
        /// 单帧时长（秒）
        frame_length: f32,
    },
}

/// 针对具体贴图尺寸计算出的动画参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationParams {
    pub frame_count: u32,
    /// 单帧时长（秒）
    pub frame_length: f32,
    /// 单帧像素尺寸
    pub frame_size: UVec2,
}

impl TileAnimation {
    pub fn is_animated(&self) -> bool {
        !matches!(self, TileAnimation::None)
    }

    fn vertical_frame_height(texture_size: UVec2, aspect_w: u16, aspect_h: u16) -> u32 {
        if aspect_w == 0 {
            return texture_size.y.max(1);
        }
        let height = texture_size.x as f32 / f32::from(aspect_w) * f32::from(aspect_h);
        (height as u32).max(1)
    }

    /// 计算帧数、帧时长和帧尺寸；无动画时返回 `None`
    pub fn determine_params(&self, texture_size: UVec2) -> Option<AnimationParams> {
        match *self {
            TileAnimation::None => None,
            TileAnimation::VerticalFrames {
                aspect_w,
                aspect_h,
                length,
            } => {
                let frame_height = Self::vertical_frame_height(texture_size, aspect_w, aspect_h);
                let frame_count = (texture_size.y / frame_height).max(1);
                Some(AnimationParams {
                    frame_count,
                    frame_length: length / frame_count as f32,
                    frame_size: UVec2::new(texture_size.x, frame_height),
                })
            }
            TileAnimation::Sheet2D {
                frames_w,
                frames_h,
                frame_length,
            } => {
                let w = u32::from(frames_w.max(1));
                let h = u32::from(frames_h.max(1));
                Some(AnimationParams {
                    frame_count: w * h,
                    frame_length,
                    frame_size: UVec2::new(texture_size.x / w, texture_size.y / h),
                })
            }
        }
    }

    /// 第 `frame` 帧左上角的归一化贴图坐标（帧号按帧数取模）
    pub fn texture_coords(&self, texture_size: UVec2, frame: u32) -> Vec2 {
        if texture_size.x == 0 || texture_size.y == 0 {
            return Vec2::ZERO;
        }
        let Some(params) = self.determine_params(texture_size) else {
            return Vec2::ZERO;
        };
        let frame = frame % params.frame_count;
        let offset = match *self {
            TileAnimation::None => UVec2::ZERO,
            TileAnimation::VerticalFrames { .. } => UVec2::new(0, params.frame_size.y * frame),
            TileAnimation::Sheet2D { frames_w, .. } => {
                let w = u32::from(frames_w.max(1));
                UVec2::new((frame % w) * params.frame_size.x, (frame / w) * params.frame_size.y)
            }
        };
        offset.as_vec2() / texture_size.as_vec2()
    }

    /// 把负数（自动）长度换算为与粒子寿命匹配的实际长度
    ///
    /// 额外加 0.1 秒，防止第一帧在粒子消失前重新闪现。
    pub fn sync_with_lifetime(&mut self, expiration_time: f32) {
        match self {
            TileAnimation::None => {}
            TileAnimation::VerticalFrames { length, .. } => {
                if *length < 0.0 {
                    *length = expiration_time / -*length + 0.1;
                }
            }
            TileAnimation::Sheet2D {
                frames_w,
                frames_h,
                frame_length,
            } => {
                if *frame_length < 0.0 {
                    let frames = f32::from((*frames_w).max(1)) * f32::from((*frames_h).max(1));
                    let runtime = expiration_time / -*frame_length + 0.1;
                    *frame_length = runtime / frames;
                }
            }
        }
    }
}
