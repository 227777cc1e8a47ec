// Folderbot Infrastructure - System Adapters
// Implements: Uploader, FolderCatalog, SystemProbe

pub mod local_folder_catalog;
pub mod subprocess_uploader;
pub mod system_probe_impl;

pub use local_folder_catalog::LocalFolderCatalog;
pub use subprocess_uploader::{interpret_output, SubprocessUploader, UploaderConfig};
pub use system_probe_impl::SystemProbeImpl;
