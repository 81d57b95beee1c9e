use super::PackageManager;

/// Known system package managers in detection priority order.
pub fn system_managers() -> Vec<PackageManager> {
    vec![
        PackageManager::new("apt", "install")
            .no_interactive("-y")
            .multi_install()
            .sudo(),
        PackageManager::new("dnf", "install")
            .no_interactive("-y")
            .multi_install()
            .sudo(),
        PackageManager::new("microdnf", "install")
            .no_interactive("-y")
            .multi_install()
            .sudo(),
        PackageManager::new("yum", "install")
            .no_interactive("-y")
            .multi_install()
            .sudo(),
        PackageManager::new("apk", "add").multi_install().sudo(),
        PackageManager::new("brew", "install").multi_install(),
        PackageManager::new("pacman", "-S")
            .no_interactive("--noconfirm")
            .multi_install()
            .sudo(),
        PackageManager::new("zypper", "install")
            .no_interactive("--non-interactive")
            .multi_install()
            .sudo(),
        PackageManager::new("port", "install").multi_install().sudo(),
        PackageManager::new("nix-env", "-i").multi_install(),
        PackageManager::new("flatpak", "install").no_interactive("-y"),
        PackageManager::new("snap", "install"),
    ]
}

/// Language-level managers a toolchain can install extra packages with.
pub fn secondary_managers() -> Vec<PackageManager> {
    vec![
        // `go install` takes one module per invocation.
        PackageManager::new("go", "install"),
        PackageManager::new("pip", "install").multi_install(),
        PackageManager::new("npm", "install")
            .no_interactive("--user")
            .multi_install(),
        PackageManager::new("cargo", "install").multi_install(),
        PackageManager::new("krew", "install").multi_install(),
    ]
}

pub fn secondary_manager(name: &str) -> Option<PackageManager> {
    secondary_managers()
        .into_iter()
        .find(|manager| manager.name() == name)
}

/// Installs editor extensions, one per invocation, without elevation.
pub fn editor_manager() -> PackageManager {
    PackageManager::new("code", "--install-extension").no_interactive("--force")
}
