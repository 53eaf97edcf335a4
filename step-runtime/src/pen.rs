//! # Pen 模块
//!
//! 书写光标：记录最近一次"书写"结束时笔尖所在的位置。
//!
//! 书写类效果（文本书写、注释框描边）从这里开始下笔，结束后把位置
//! 写回，从而呈现连续手写的观感。光标属于一个图表会话，而不是全局状态。

use std::cell::Cell;
use std::rc::Rc;

use kurbo::Point;

/// 共享的笔尖位置
#[derive(Debug, Clone, Default)]
pub struct PenCursor {
    position: Rc<Cell<Option<Point>>>,
}

impl PenCursor {
    /// 创建空光标
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前笔尖位置（尚未书写过时为 `None`）
    pub fn get(&self) -> Option<Point> {
        self.position.get()
    }

    /// 更新笔尖位置
    pub fn set(&self, point: Point) {
        self.position.set(Some(point));
    }

    /// 清空光标
    pub fn clear(&self) {
        self.position.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_position() {
        let pen = PenCursor::new();
        let other = pen.clone();
        assert_eq!(pen.get(), None);

        other.set(Point::new(3.0, 4.0));
        assert_eq!(pen.get(), Some(Point::new(3.0, 4.0)));

        pen.clear();
        assert_eq!(other.get(), None);
    }
}
