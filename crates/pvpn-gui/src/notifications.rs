use notify_rust::Notification;

pub fn send_notification(summary: &str, body: &str) {
    let mut notification = Notification::new();
    notification
        .summary(summary)
        .body(body)
        .appname("ProtonVPN-CLI-GUI")
        .timeout(5000);

    #[cfg(target_os = "linux")]
    {
        notification.icon("network-vpn");
    }

    if let Err(e) = notification.show() {
        log::error!("Failed to show notification: {}", e);
    }
}
