//! `FastPimpl` storage member

use flex_plugin_api::{AnnotationInvocation, GenerationError};

pub const DEFAULT_ALIGNMENT: u64 = 8;

/// Parsed `inject-pimpl-storage` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageArgs {
    pub size: u64,
    pub alignment: u64,
    pub size_padding: u64,
}

impl StorageArgs {
    pub fn parse(invocation: &AnnotationInvocation) -> Result<Self, GenerationError> {
        let mut size = None;
        let mut alignment = DEFAULT_ALIGNMENT;
        let mut size_padding = 0;

        for arg in &invocation.args {
            let Some(name) = arg.name.as_deref() else {
                return Err(GenerationError::invalid_input(format!(
                    "unexpected argument '{}' for inject-pimpl-storage",
                    arg.value
                )));
            };
            match name {
                "size" => size = Some(integer(name, &arg.value)?),
                "alignment" => alignment = integer(name, &arg.value)?,
                "sizePadding" => size_padding = integer(name, &arg.value)?,
                other => {
                    return Err(GenerationError::invalid_input(format!(
                        "unknown argument '{}' with value '{}'",
                        other, arg.value
                    )))
                }
            }
        }

        let size = size.ok_or_else(|| {
            GenerationError::invalid_input(
                "inject-pimpl-storage needs `size = <bytes>`: the implementation layout is unknown",
            )
        })?;
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(GenerationError::invalid_input(format!(
                "alignment {} is not a power of two",
                alignment
            )));
        }

        Ok(Self {
            size,
            alignment,
            size_padding,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.size.saturating_add(self.size_padding)
    }

    pub fn render(&self, impl_type: &str) -> String {
        format!(
            "::pimpl::FastPimpl<{}, /*Size*/{}, /*Alignment*/{}, ::pimpl::SizePolicy::AtLeast, ::pimpl::AlignPolicy::AtLeast> impl_;\n",
            impl_type,
            self.total_size(),
            self.alignment
        )
    }
}

fn integer(name: &str, value: &str) -> Result<u64, GenerationError> {
    value.trim().parse::<u64>().map_err(|_| {
        GenerationError::invalid_input(format!(
            "unable to convert argument '{}' with value '{}' to an integer",
            name, value
        ))
    })
}
