//! Well-known Android shell commands and command builders.
//!
//! Everything here is plain string construction; the strings are sent
//! verbatim as shell command lines.

/// Android version (release string).
pub const GET_ANDROID_VERSION: &str = "getprop ro.build.version.release";

/// SDK API level.
pub const GET_API_LEVEL: &str = "getprop ro.build.version.sdk";

/// Device model.
pub const GET_DEVICE_MODEL: &str = "getprop ro.product.model";

/// Device brand.
pub const GET_DEVICE_BRAND: &str = "getprop ro.product.brand";

/// Device serial number.
pub const GET_SERIAL_NUMBER: &str = "getprop ro.serialno";

/// All installed packages.
pub const LIST_PACKAGES: &str = "pm list packages";

/// Third-party packages only.
pub const LIST_THIRD_PARTY_PACKAGES: &str = "pm list packages -3";

/// The currently focused window.
pub const GET_CURRENT_ACTIVITY: &str = "dumpsys activity | grep mCurrentFocus";

/// Running processes.
pub const LIST_PROCESSES: &str = "ps";

/// Filesystem usage.
pub const GET_STORAGE_INFO: &str = "df -h";

/// Reads a system property.
pub fn get_property(key: &str) -> String {
    format!("getprop {key}")
}

/// Sets a system property.
pub fn set_property(key: &str, value: &str) -> String {
    format!("setprop {key} {value}")
}

/// Starts an activity by package and class name.
pub fn start_activity(package: &str, activity: &str) -> String {
    format!("am start -n {package}/{activity}")
}

/// Force-stops an application.
pub fn stop_app(package: &str) -> String {
    format!("am force-stop {package}")
}

/// Checks whether a package is installed (non-empty output means yes).
pub fn query_package(package: &str) -> String {
    format!("pm list packages {package}")
}

/// Grants a runtime permission to a package.
pub fn grant_permission(package: &str, permission: &str) -> String {
    format!("pm grant {package} {permission}")
}

/// Captures the screen to a file on the device.
pub fn take_screenshot(output_path: &str) -> String {
    format!("screencap -p {output_path}")
}
