use std::io;

use crate::render::SurfaceOp;

/// Output sink for a session: receives styled text and erase operations.
pub trait Surface {
    fn apply(&mut self, op: SurfaceOp);

    fn apply_all(&mut self, ops: Vec<SurfaceOp>) {
        for op in ops {
            self.apply(op);
        }
    }

    /// Pushes buffered output to the underlying device, if any.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Surface that keeps every operation it receives, for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<SurfaceOp>,
}

#[cfg(test)]
impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn count_style(&self, style: crate::render::Style) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SurfaceOp::Text(s, _) if *s == style))
            .count()
    }

    pub fn texts(&self, style: crate::render::Style) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Text(s, text) if *s == style => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn apply(&mut self, op: SurfaceOp) {
        self.ops.push(op);
    }
}
