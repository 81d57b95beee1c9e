use super::{command_hook, Toolchain};
use crate::error::DevboxError;
use crate::package_manager::secondary_manager;
use crate::process::CommandSpec;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};

/// Name of the baseline toolchain installed by `devbox setup`.
pub const SETUP_TOOLCHAIN: &str = "setup";

/// Editor installed and exported by `devbox setup`.
pub const DEFAULT_IDE: &str = "code";

/// Registry of known toolchains, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    toolchains: BTreeMap<String, Toolchain>,
    setup: Toolchain,
}

impl Catalog {
    pub fn builtin() -> Self {
        let toolchains = builtin_toolchains()
            .into_iter()
            .map(|toolchain| (toolchain.name.clone(), toolchain))
            .collect();
        Self {
            toolchains,
            setup: setup_toolchain(),
        }
    }

    /// Add toolchains, replacing built-in ones with the same name.
    pub fn with_toolchains(mut self, extra: Vec<Toolchain>) -> Self {
        for toolchain in extra {
            if toolchain.name == SETUP_TOOLCHAIN {
                tracing::debug!("Replacing setup toolchain from config");
                self.setup = toolchain;
            } else {
                tracing::debug!(toolchain = %toolchain.name, "Registering toolchain from config");
                self.toolchains.insert(toolchain.name.clone(), toolchain);
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Toolchain> {
        self.toolchains.get(name)
    }

    /// Selectable toolchains in name order. The setup toolchain is not listed.
    pub fn iter(&self) -> impl Iterator<Item = &Toolchain> {
        self.toolchains.values()
    }

    pub fn setup(&self) -> &Toolchain {
        &self.setup
    }

    /// Look up every requested name, reporting all unknown names at once.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Toolchain>, DevboxError> {
        let mut seen = HashSet::new();
        let names: Vec<&str> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .collect();
        if names.is_empty() {
            return Err(DevboxError::NoToolchains);
        }

        let unknown: Vec<String> = names
            .iter()
            .filter(|name| !self.toolchains.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(DevboxError::UnknownToolchain(unknown));
        }

        Ok(names
            .iter()
            .filter_map(|name| self.toolchains.get(*name).cloned())
            .collect())
    }
}

fn manager(name: &str) -> crate::package_manager::PackageManager {
    match secondary_manager(name) {
        Some(manager) => manager,
        None => unreachable!("{name} is missing from the secondary manager catalog"),
    }
}

fn setup_toolchain() -> Toolchain {
    const DEV_TOOLS: &[&str] = &["git", "tree", "curl", "wget", "vim", "jq", "yq", "bat"];

    Toolchain::new(SETUP_TOOLCHAIN, "Baseline development tools and editor setup")
        .packages(DEV_TOOLS)
        .binaries(DEV_TOOLS)
        .extensions(&[
            "davidanson.vscode-markdownlint",
            "bierner.markdown-mermaid",
            "fill-labs.dependi",
        ])
        .settings(json!({
            "dependi.rust.informPatchUpdates": true,
            "dependi.npm.informPatchUpdates": true,
            "dependi.npm.indexServerURL": "https://registry.npmjs.org",
            "dependi.rust.indexServerURL": "https://index.crates.io",
            "dependi.go.indexServerURL": "https://proxy.golang.org",
            "dependi.go.informPatchUpdates": true,
            "dependi.python.indexServerURL": "https://pypi.org/pypi",
            "dependi.python.informPatchUpdates": true,
            "dependi.vulnerability.ghsa.enabled": true,
            "diffEditor.ignoreTrimWhitespace": true,
            "diffEditor.experimental.showMoves": true,
            "editor.acceptSuggestionOnEnter": "smart",
            "editor.autoIndentOnPaste": true,
            "editor.formatOnPaste": true,
            "editor.formatOnSave": true,
            "editor.bracketPairColorization.independentColorPoolPerBracketType": true,
            "editor.guides.bracketPairs": "active",
            "editor.tabSize": 4,
            "editor.trimWhitespaceOnDelete": true,
            "explorer.incrementalNaming": "smart",
            "files.autoGuessEncoding": true,
            "files.insertFinalNewline": true,
            "files.readonlyFromPermissions": true,
            "files.trimFinalNewlines": true,
            "files.trimTrailingWhitespace": true,
            "git.autofetch": true,
            "git.confirmSync": false,
            "git.enableSmartCommit": true,
            "telemetry.telemetryLevel": "off",
            "telemetry.feedback.enabled": false,
            "testing.coverageToolbarEnabled": true,
        }))
        .env(&[
            ("XDG_CONFIG_HOME", "${XDG_CONFIG_HOME:-$HOME/.config}"),
            ("XDG_DATA_HOME", "${XDG_DATA_HOME:-$HOME/.local/share}"),
            ("XDG_CACHE_HOME", "${XDG_CACHE_HOME:-$HOME/.cache}"),
            ("XDG_STATE_HOME", "${XDG_STATE_HOME:-$HOME/.local/state}"),
            ("XDG_RUNTIME_DIR", "${XDG_RUNTIME_DIR:-/run/user/$(id -u)}"),
            ("XDG_CONFIG_DIRS", "${XDG_CONFIG_DIRS:-/etc/xdg}"),
            (
                "XDG_DATA_DIRS",
                "${XDG_DATA_DIRS:-/usr/local/share:/usr/share:$XDG_DATA_HOME}",
            ),
            ("LANG", "${LANG:-en_US.UTF-8}"),
            ("CLICOLOR", "${CLICOLOR:-1}"),
            ("EDITOR", "${EDITOR:-vim}"),
            ("OS", "$(uname | tr '[:upper:]' '[:lower:]')"),
            (
                "ARCH",
                "$(uname -m | sed -e 's/x86_64/amd64/' -e 's/aarch64$/arm64/')",
            ),
            ("ARCHFLAGS", "-arch ${ARCH}"),
        ])
}

fn builtin_toolchains() -> Vec<Toolchain> {
    let c_tools = [
        "make",
        "cmake",
        "clang-tidy",
        "cppcheck",
        "clang-format",
        "valgrind",
        "lcov",
        "gcovr",
        "gdb",
    ];
    let with = |first: &[&'static str]| -> Vec<&'static str> {
        first.iter().chain(c_tools.iter()).copied().collect()
    };

    let mut rust = Toolchain::new("rust", "Rust toolchain with cargo, rustup and common cargo plugins")
        .packages(&["rustup"])
        .binaries(&["cargo", "rustc", "rustup"])
        .extra(
            manager("cargo"),
            &["cargo-auditable", "cargo-edit", "cargo-audit", "cargo-watch"],
        )
        .extensions(&["rust-lang.rust-analyzer", "fill-labs.dependi"])
        .settings(json!({ "rust-analyzer.check.command": "clippy" }))
        .env(&[("CARGO_HOME", "${CARGO_HOME:-${XDG_DATA_HOME}/cargo}")]);
    rust.post_install = Some(command_hook(vec![
        CommandSpec::new("rustup").args(["default", "stable"]),
        CommandSpec::new("rustup").args(["component", "add", "clippy", "rustfmt"]),
    ]));

    vec![
        Toolchain::new("bash", "Bash development environment")
            .packages(&["bash", "shfmt", "shellcheck", "zsh", "fish"])
            .binaries(&["bash", "shfmt", "shellcheck", "zsh", "fish"])
            .extensions(&["timonwong.shellcheck", "foxundermoon.shell-format"])
            .settings(json!({
                "shellcheck.run": "onSave",
                "shellcheck.useWorkspaceRootAsCwd": true,
            })),
        Toolchain::new("c", "C toolchain including gcc, clang, make, cmake, gdb, and more.")
            .packages(&with(&["gcc", "clang", "cmake-gui"]))
            .binaries(&with(&["gcc", "clang", "ctest", "cpack", "cmake-gui"]))
            .extensions(&[
                "ms-vscode.makefile-tools",
                "ms-vscode.cpptools",
                "ms-vscode.cpptools-extension-pack",
                "ms-vscode.cmake-tools",
                "ms-vscode.cpptools-themes",
            ])
            .settings(json!({
                "makefile.configureOnOpen": true,
                "cmake.deleteBuildDirOnCleanConfigure": true,
            })),
        Toolchain::new("container", "Container tooling with podman, hadolint and trivy")
            .packages(&["podman", "hadolint", "trivy"])
            .binaries(&["podman", "hadolint", "trivy"])
            .extensions(&["exiasr.hadolint", "ms-azuretools.vscode-docker"]),
        Toolchain::new("cpp", "C++ toolchain including g++, clang++, make, cmake, gdb, and more.")
            .packages(&with(&["g++", "clang"]))
            .binaries(&with(&["g++", "clang++"]))
            .extensions(&[
                "ms-vscode.cpptools",
                "ms-vscode.cpptools-extension-pack",
                "ms-vscode.cmake-tools",
            ]),
        Toolchain::new("github", "GitHub command line tools")
            .packages(&["gh", "hub", "git-lfs"])
            .binaries(&["gh", "hub", "git-lfs"])
            .extensions(&["github.vscode-pull-request-github", "github.vscode-github-actions"]),
        Toolchain::new("gitlab", "GitLab command line tools")
            .packages(&["yamllint", "glab", "git-lfs"])
            .binaries(&["yamllint", "glab", "git-lfs"])
            .extensions(&["gitlab.gitlab-workflow"]),
        Toolchain::new("golang", "Go toolchain with gopls, delve, staticcheck and linters")
            .packages(&["golang"])
            .binaries(&["go", "gofmt"])
            .extra(
                manager("go"),
                &[
                    "github.com/securego/gosec/v2/cmd/gosec@latest",
                    "github.com/golangci/golangci-lint/v2/cmd/golangci-lint@latest",
                    "honnef.co/go/tools/staticcheck@latest",
                    "github.com/axw/gocov/gocov@latest",
                    "golang.org/x/tools/gopls@latest",
                    "golang.org/x/tools/cmd/godoc@latest",
                    "github.com/go-delve/delve/cmd/dlv@latest",
                ],
            )
            .extensions(&["golang.go"])
            .env(&[
                ("GOMAXPROCS", "${GOMAXPROCS:-$(nproc)}"),
                ("GOPATH", "${GOPATH:-${XDG_DATA_HOME}/go}"),
                ("GOCACHE", "${GOCACHE:-${XDG_CACHE_HOME}/go}"),
                ("GO111MODULE", "${GO111MODULE:-on}"),
                ("CGO_ENABLED", "${CGO_ENABLED:-0}"),
                ("GOFLAGS", "${GOFLAGS:--trimpath -modcacherw}"),
                ("GOPROXY", "${GOPROXY:-https://proxy.golang.org,direct}"),
                ("GOSUMDB", "${GOSUMDB:-sum.golang.org}"),
            ]),
        Toolchain::new("java", "Java development environment")
            .packages(&["jacoco", "java-25-openjdk", "junit", "maven"])
            .binaries(&[
                "jar", "jarsigner", "javac", "java", "javadoc", "javap", "jcmd", "jconsole",
                "jdb", "jdeprscan", "jdeps", "jfr", "jhsdb", "jimage", "jlink", "jmod",
                "jpackage", "jps", "jrunscript", "jshell", "jstat", "jstatd", "keytool", "mvn",
                "jacococli",
            ])
            .extensions(&["vscjava.vscode-java-pack"]),
        Toolchain::new(
            "kubernetes",
            "Kubernetes toolchain including kubectl, kustomize, helm, yamllint, and more.",
        )
        .packages(&["kubectl", "kustomize", "helm", "yamllint", "graphviz", "k9s"])
        .binaries(&["kubectl", "kustomize", "helm", "yamllint", "dot", "k9s"])
        .extra(
            manager("go"),
            &[
                "sigs.k8s.io/krew/cmd/krew@latest",
                "github.com/norwoodj/helm-docs/cmd/helm-docs@latest",
                "sigs.k8s.io/kind@latest",
            ],
        )
        .extra(manager("pip"), &["KubeDiagrams"])
        .extra(
            manager("krew"),
            &[
                "ai",
                "blame",
                "cost",
                "debug-shell",
                "deprecations",
                "explore",
                "flame",
                "kor",
                "neat",
                "tree",
            ],
        )
        .extensions(&["ms-kubernetes-tools.vscode-kubernetes-tools"])
        .env(&[
            ("KREW_ROOT", "${KREW_ROOT:-${XDG_DATA_HOME}/krew}"),
            ("KIND_EXPERIMENTAL_PROVIDER", "podman"),
        ]),
        Toolchain::new("node", "Node.js with npm, yarn and common JavaScript tooling")
            .packages(&["nodejs", "npm", "yarnpkg"])
            .binaries(&["npm", "npx", "node", "yarn"])
            .extra(
                manager("npm"),
                &["eslint", "prettier", "typescript", "jest", "ts-node"],
            )
            .extensions(&["dbaeumer.vscode-eslint", "esbenp.prettier-vscode"]),
        Toolchain::new("python", "Python with pip, linters, formatters and pytest")
            .packages(&["python3", "python3-pip"])
            .binaries(&["python3", "pip3"])
            .extra(
                manager("pip"),
                &[
                    "pylint", "black", "bandit", "pytest", "mypy", "flake8", "autopep8",
                ],
            )
            .extensions(&["ms-python.python", "ms-python.black-formatter"])
            .settings(json!({ "python.testing.pytestEnabled": true })),
        rust,
    ]
}
