//! Sample nodes hosted by the demo: a user that only sends, a canvas with
//! undoable state and a status bar that follows the history counters.

use node_bus::{
    params, Compensation, NodeBuilder, NodeBus, UndoAction, BUS_STARTED, UNDO_REDO_COUNTERS,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

pub const USER: &str = "USER";
pub const CANVAS: &str = "CANVAS";
pub const STATUS_BAR: &str = "STATUS_BAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasState {
    pub color: String,
    pub width: i64,
    pub height: i64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            color: "white".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Handlers for `PAINT` and `RESIZE`. Both compensate with the values they
/// replaced.
pub fn canvas_node(state: Arc<Mutex<CanvasState>>) -> NodeBuilder {
    let paint_state = Arc::clone(&state);
    NodeBuilder::new()
        .on("PAINT", &["color"], move |delivery| {
            let color: String = delivery.parameter("color")?;
            let previous = std::mem::replace(&mut paint_state.lock().color, color);
            Ok(Compensation::one(UndoAction::new(
                "PAINT",
                params! { "color" => previous },
            )))
        })
        .on("RESIZE", &["width", "height"], move |delivery| {
            let width: i64 = delivery.parameter("width")?;
            let height: i64 = delivery.parameter("height")?;
            let mut canvas = state.lock();
            let previous = (canvas.width, canvas.height);
            canvas.width = width;
            canvas.height = height;
            Ok(Compensation::one(UndoAction::new(
                "RESIZE",
                params! { "width" => previous.0, "height" => previous.1 },
            )))
        })
}

/// Logs bus startup and every history counter update.
pub fn status_bar_node() -> NodeBuilder {
    NodeBuilder::new()
        .on(BUS_STARTED, &[], |_| {
            info!("🟢 Status bar online");
            Ok(Compensation::none())
        })
        .on(
            UNDO_REDO_COUNTERS,
            &["undo_counter", "redo_counter"],
            |delivery| {
                let undo: usize = delivery.parameter("undo_counter")?;
                let redo: usize = delivery.parameter("redo_counter")?;
                info!("📊 History: {} undo / {} redo", undo, redo);
                Ok(Compensation::none())
            },
        )
}

/// Registers the three sample nodes. The `PAINT` and `RESIZE` events have
/// to be registered already.
pub fn register_demo_nodes(bus: &NodeBus, canvas: Arc<Mutex<CanvasState>>) -> node_bus::Result<()> {
    bus.register_node(USER, NodeBuilder::new())?;
    bus.register_node(CANVAS, canvas_node(canvas))?;
    bus.register_node(STATUS_BAR, status_bar_node())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn demo_bus() -> (NodeBus, Arc<Mutex<CanvasState>>) {
        let bus = NodeBus::new();
        AppConfig::default().register_events(&bus).unwrap();
        let canvas = Arc::new(Mutex::new(CanvasState::default()));
        register_demo_nodes(&bus, Arc::clone(&canvas)).unwrap();
        bus.start(None, None).unwrap();
        (bus, canvas)
    }

    #[test]
    fn test_paint_and_resize_undo_in_order() {
        let (bus, canvas) = demo_bus();
        bus.publish("PAINT", USER, CANVAS, params! { "color" => "red" })
            .unwrap();
        bus.publish(
            "RESIZE",
            USER,
            CANVAS,
            params! { "width" => 1024, "height" => 768 },
        )
        .unwrap();
        assert_eq!(
            *canvas.lock(),
            CanvasState {
                color: "red".to_string(),
                width: 1024,
                height: 768,
            }
        );

        bus.undo().unwrap();
        assert_eq!(canvas.lock().width, 800);
        assert_eq!(canvas.lock().color, "red");

        bus.undo().unwrap();
        assert_eq!(*canvas.lock(), CanvasState::default());

        bus.redo().unwrap();
        bus.redo().unwrap();
        assert_eq!(canvas.lock().height, 768);
        assert_eq!(canvas.lock().color, "red");
    }

    #[test]
    fn test_nodes_subscribe_as_expected() {
        let (bus, _canvas) = demo_bus();
        assert_eq!(bus.subscribers("PAINT"), [CANVAS]);
        assert_eq!(bus.subscribers(UNDO_REDO_COUNTERS), [STATUS_BAR]);
        assert!(bus.is_node_registered(USER));
    }
}
