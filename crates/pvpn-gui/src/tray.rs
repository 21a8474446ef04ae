use tray_icon::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    TrayIcon, TrayIconBuilder,
};

use crate::types::{TRAY_ICON_CONNECTED, TRAY_ICON_DISCONNECTED};

pub struct TrayComponents {
    pub tray: TrayIcon,
    pub show_item: MenuItem,
    pub connect_item: MenuItem,
    pub disconnect_item: MenuItem,
}

const TRAY_RENDER_SIZE: u32 = 256;

/// Rasterizes SVG bytes into a tray icon.
fn svg_to_tray_icon(svg_bytes: &[u8]) -> anyhow::Result<tray_icon::Icon> {
    let opt = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(svg_bytes, &opt)?;

    let size = TRAY_RENDER_SIZE;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| anyhow::anyhow!("Failed to create pixmap"))?;

    let transform = resvg::tiny_skia::Transform::from_scale(
        size as f32 / tree.size().width(),
        size as f32 / tree.size().height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(tray_icon::Icon::from_rgba(pixmap.data().to_vec(), size, size)?)
}

/// Solid purple square, used when the SVG cannot be rendered.
fn fallback_icon() -> anyhow::Result<tray_icon::Icon> {
    let rgba = [109u8, 74, 255, 255].repeat(32 * 32);
    Ok(tray_icon::Icon::from_rgba(rgba, 32, 32)?)
}

pub fn init_tray() -> anyhow::Result<TrayComponents> {
    let show_item = MenuItem::with_id("show", "Toggle Visibility", true, None);
    let connect_item = MenuItem::with_id("connect", "Quick Connect", true, None);
    let disconnect_item = MenuItem::with_id("disconnect", "Disconnect", false, None);
    let quit_item = MenuItem::with_id("quit", "Quit", true, None);

    let tray_menu = Menu::with_items(&[
        &show_item,
        &connect_item,
        &disconnect_item,
        &PredefinedMenuItem::separator(),
        &quit_item,
    ])?;

    let icon = match svg_to_tray_icon(TRAY_ICON_DISCONNECTED) {
        Ok(icon) => icon,
        Err(e) => {
            log::warn!("Failed to load tray icon from SVG: {}, using fallback", e);
            fallback_icon()?
        }
    };

    let tray = TrayIconBuilder::new()
        .with_menu(Box::new(tray_menu))
        .with_tooltip("ProtonVPN - Disconnected")
        .with_icon(icon)
        .build()?;

    Ok(TrayComponents {
        tray,
        show_item,
        connect_item,
        disconnect_item,
    })
}

pub fn tray_tooltip(server: Option<&str>, connected: bool) -> String {
    match (connected, server) {
        (true, Some(server)) => format!("ProtonVPN - Connected to {}", server),
        (true, None) => "ProtonVPN - Connected".to_string(),
        (false, _) => "ProtonVPN - Disconnected".to_string(),
    }
}

/// Updates the tray icon, tooltip and menu for the connection state.
pub fn update_tray(components: &TrayComponents, connected: bool, server: Option<&str>) {
    let svg_bytes = if connected {
        TRAY_ICON_CONNECTED
    } else {
        TRAY_ICON_DISCONNECTED
    };

    let _ = components
        .tray
        .set_tooltip(Some(tray_tooltip(server, connected)));
    components.connect_item.set_enabled(!connected);
    components.disconnect_item.set_enabled(connected);

    match svg_to_tray_icon(svg_bytes) {
        Err(e) => log::error!("Failed to convert SVG to tray icon: {}", e),
        Ok(icon) => {
            if let Err(e) = components.tray.set_icon(Some(icon)) {
                log::error!("Failed to update tray icon: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tray_svgs_render() {
        assert!(svg_to_tray_icon(TRAY_ICON_CONNECTED).is_ok());
        assert!(svg_to_tray_icon(TRAY_ICON_DISCONNECTED).is_ok());
        assert!(svg_to_tray_icon(b"not svg").is_err());
    }

    #[test]
    fn tooltips() {
        assert_eq!(
            tray_tooltip(Some("CH#4"), true),
            "ProtonVPN - Connected to CH#4"
        );
        assert_eq!(tray_tooltip(Some("CH#4"), false), "ProtonVPN - Disconnected");
    }
}
