use std::fmt;

/// How the file display screen should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDisplayOptions {
    /// Show only files present on this device. `None` keeps the current choice.
    pub on_device_only: Option<bool>,
    /// Drop every screen above the file display from the back stack.
    pub clear_top: bool,
}

/// A request to leave the folder sync screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    FileDisplay(FileDisplayOptions),
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileDisplay(options) => {
                write!(f, "file display")?;
                match options.on_device_only {
                    Some(true) => write!(f, " (on-device files only)")?,
                    Some(false) => write!(f, " (all files)")?,
                    None => {}
                }
                if options.clear_top {
                    write!(f, ", clearing back stack")?;
                }
                Ok(())
            }
        }
    }
}
