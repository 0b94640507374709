//! Touch frames → key-state vectors, with visual feedback.
//!
//! [`TouchPipeline`] owns the compiled [`TouchResolver`] and the layout it was
//! compiled from.  Each frame yields the full vector to send; keys whose bit
//! flipped are pushed to a [`KeyDisplay`].  A resize rescales the layout and
//! recompiles from scratch.

use tracing::{debug, info};
use touchkey_core::{KeyStateVector, Kflag, LayoutError, TouchFrame, TouchResolver};

use crate::domain::layout_file::LayoutFile;

/// Receives active/inactive display changes for individual keys.
#[cfg_attr(test, mockall::automock)]
pub trait KeyDisplay: Send {
    fn set_active(&mut self, kflag: Kflag, active: bool);
}

/// Display that reports changes in the log.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl KeyDisplay for LogDisplay {
    fn set_active(&mut self, kflag: Kflag, active: bool) {
        info!(kflag, active, "key display");
    }
}

/// Resolver plus display for one touch surface.
pub struct TouchPipeline<D: KeyDisplay> {
    resolver: TouchResolver,
    layout: LayoutFile,
    display: D,
    last_state: KeyStateVector,
}

impl<D: KeyDisplay> TouchPipeline<D> {
    /// Compiles `layout` at its own viewport width.
    pub fn new(layout: LayoutFile, display: D) -> Result<Self, LayoutError> {
        let resolver = TouchResolver::compile(&layout.elements(), layout.viewport_width)?;
        info!(
            keys = resolver.key_count(),
            viewport_width = layout.viewport_width,
            "touch layout compiled"
        );
        Ok(Self {
            last_state: KeyStateVector::new(resolver.key_count()),
            resolver,
            layout,
            display,
        })
    }

    pub fn key_count(&self) -> usize {
        self.resolver.key_count()
    }

    pub fn layout(&self) -> &LayoutFile {
        &self.layout
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Resolves one frame and updates the display.
    pub fn on_frame(&mut self, frame: &TouchFrame) -> KeyStateVector {
        let result = self.resolver.compute_frame(frame);
        for change in &result.changes {
            self.display.set_active(change.kflag, change.active);
        }
        debug!(state = %result.state, touches = frame.points.len(), "touch frame");
        self.last_state = result.state.clone();
        result.state
    }

    /// Rescales the layout to `viewport_width` and recompiles it.
    ///
    /// Every key shown active is cleared first.  Returns the all-released
    /// vector for the new layout, to be sent so the service lets go of
    /// anything held under the old geometry.  On error the resolver has no
    /// keys and every frame resolves to an empty vector until the next
    /// successful resize.
    pub fn resize(&mut self, viewport_width: u32) -> Result<KeyStateVector, LayoutError> {
        for kflag in self.last_state.active() {
            self.display.set_active(kflag, false);
        }
        self.layout = self.layout.scaled_to(viewport_width);
        let result = self
            .resolver
            .recompile(&self.layout.elements(), viewport_width);
        self.last_state = KeyStateVector::new(self.resolver.key_count());
        result.map(|()| self.last_state.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;

    fn frame(points: &[(f64, f64)]) -> TouchFrame {
        TouchFrame::from_points(points.iter().copied())
    }

    #[test]
    fn test_frame_sets_display_for_changed_keys_only() {
        // Arrange: 4 keys of 100px; the touch stays in key 1's centre
        let mut display = MockKeyDisplay::new();
        display
            .expect_set_active()
            .with(eq(1), eq(true))
            .times(1)
            .return_const(());
        let mut pipeline =
            TouchPipeline::new(LayoutFile::even_row(4, 400, 0, 100), display).unwrap();

        // Act
        let first = pipeline.on_frame(&frame(&[(150.0, 50.0)]));
        let second = pipeline.on_frame(&frame(&[(150.0, 50.0)]));

        // Assert
        assert_eq!(first.to_string(), "0100");
        assert_eq!(second, first);
    }

    #[test]
    fn test_release_clears_display() {
        let mut display = MockKeyDisplay::new();
        display
            .expect_set_active()
            .with(eq(2), eq(true))
            .times(1)
            .return_const(());
        display
            .expect_set_active()
            .with(eq(2), eq(false))
            .times(1)
            .return_const(());
        let mut pipeline =
            TouchPipeline::new(LayoutFile::even_row(4, 400, 0, 100), display).unwrap();

        pipeline.on_frame(&frame(&[(250.0, 50.0)]));
        let released = pipeline.on_frame(&frame(&[]));

        assert!(released.none_active());
    }

    #[test]
    fn test_resize_clears_active_keys_and_rescales() {
        // Arrange
        let mut display = MockKeyDisplay::new();
        display
            .expect_set_active()
            .with(eq(0), eq(true))
            .times(1)
            .return_const(());
        display
            .expect_set_active()
            .with(eq(0), eq(false))
            .times(1)
            .return_const(());
        let mut pipeline =
            TouchPipeline::new(LayoutFile::even_row(4, 400, 0, 100), display).unwrap();
        pipeline.on_frame(&frame(&[(50.0, 50.0)]));

        // Act
        let released = pipeline.resize(800).unwrap();

        // Assert
        assert_eq!(pipeline.layout().viewport_width, 800);
        assert_eq!(pipeline.key_count(), 4);
        assert_eq!(released.to_string(), "0000");
    }

    #[test]
    fn test_vector_length_matches_key_count() {
        let mut pipeline =
            TouchPipeline::new(LayoutFile::even_row(16, 1600, 0, 200), LogDisplay).unwrap();
        assert_eq!(pipeline.on_frame(&frame(&[])).len(), 16);
    }

    #[test]
    fn test_empty_layout_is_rejected() {
        let layout = LayoutFile {
            viewport_width: 100,
            keys: Vec::new(),
        };
        assert!(matches!(
            TouchPipeline::new(layout, LogDisplay),
            Err(LayoutError::Empty)
        ));
    }
}
