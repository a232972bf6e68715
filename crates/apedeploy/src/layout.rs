//! Static layout of the plugin bundle
//!
//! Everything here is fixed by the project checkout: where the skeleton and the
//! vendored trees live, where each of them lands inside the bundle, and which
//! build outputs are copied to which bundle paths.

use camino::{Utf8Path, Utf8PathBuf};

/// Name of the plugin folder created under the install root
pub const PRODUCT_NAME: &str = "Audio Programming Environment";

/// Example directory inside the bundle that the plugin reads from
pub const EXAMPLES_DIR: &str = "examples";

/// Example directory used for the snapshot copy in non-release builds
pub const EXAMPLES_SNAPSHOT_DIR: &str = "examples-release";

/// File name patterns never copied out of the snippet tree
pub const SNIPPET_EXCLUDES: &[&str] = &["*.md", "*.git"];

/// A third-party or sibling tree merged into a fixed bundle subpath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTree {
    /// Short name used in log output
    pub name: String,
    /// Source directory, relative to the project root
    pub source: Utf8PathBuf,
    /// Destination, relative to the bundle root
    pub target: Utf8PathBuf,
}

impl VendorTree {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<Utf8PathBuf>,
        target: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Where a build output is picked up from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOrigin {
    /// The per-platform build output directory
    BuildOutput,
    /// The platform-agnostic output directory, falling back to the build output
    PlatformAgnostic,
}

/// A build output copied into the bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name inside the output directory
    pub file_name: String,
    /// Destination, relative to the bundle root
    pub target: Utf8PathBuf,
    pub origin: ArtifactOrigin,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, target: impl Into<Utf8PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            target: target.into(),
            origin: ArtifactOrigin::BuildOutput,
        }
    }

    pub fn platform_agnostic(mut self) -> Self {
        self.origin = ArtifactOrigin::PlatformAgnostic;
        self
    }
}

/// Paths of a project checkout and the bundle composed from it
#[derive(Debug, Clone)]
pub struct BundleLayout {
    /// Project checkout root
    pub root: Utf8PathBuf,
    /// Skeleton tree, relative to the root
    pub skeleton: Utf8PathBuf,
    /// Trees merged under fixed bundle subpaths, in merge order
    pub vendor_trees: Vec<VendorTree>,
    /// Example snippet repository, relative to the root
    pub snippets: Utf8PathBuf,
    /// Build outputs copied into the bundle
    pub artifacts: Vec<Artifact>,
}

impl BundleLayout {
    /// Layout of the Audio Programming Environment checkout at `root`
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            skeleton: Utf8PathBuf::from("make/skeleton"),
            vendor_trees: vec![
                VendorTree::new("ccore", "external/ccore/include", "includes/ccore"),
                VendorTree::new("libcxx", "external/libcxx/include", "includes/libcxx"),
                VendorTree::new(
                    "libcxx-src",
                    "external/libcxx/src",
                    "compilers/CppAPE/runtime/libcxx-src",
                ),
                VendorTree::new("shared-src", "shared-src", "includes/shared-src"),
            ],
            snippets: Utf8PathBuf::from("external/ape-snippets"),
            artifacts: vec![
                Artifact::new(
                    "Audio Programming Environment.dll",
                    "Audio Programming Environment.dll",
                ),
                Artifact::new("CppAPE.dll", "compilers/CppAPE/CppAPE.dll"),
                Artifact::new("Tcc4APE.dll", "compilers/TCC4APE/Tcc4APE.dll"),
                Artifact::new("syswrap.dll", "compilers/syswrap/syswrap.dll"),
            ],
        }
    }

    /// Directory holding build scripts, configuration and the staging tree
    pub fn make_dir(&self) -> Utf8PathBuf {
        self.root.join("make")
    }

    /// Ephemeral staging tree
    pub fn staging_dir(&self) -> Utf8PathBuf {
        self.make_dir().join("temp")
    }

    pub fn skeleton_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.skeleton)
    }

    pub fn snippets_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.snippets)
    }

    /// Resolve a path relative to the project root
    pub fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.root.join(relative)
    }
}

/// Example directory the snapshot copy goes to for a build mode.
///
/// Release bundles ship the snapshot as the real example directory. Development
/// bundles keep it beside that directory, which is left free for a live alias.
pub fn examples_dir_name(release: bool) -> &'static str {
    if release {
        EXAMPLES_DIR
    } else {
        EXAMPLES_SNAPSHOT_DIR
    }
}
