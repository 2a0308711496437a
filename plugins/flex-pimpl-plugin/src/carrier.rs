//! Settings carried by an annotated pimpl template
//!
//! ```cpp
//! template<typename impl = example_impl::FooImpl, typename interface = Foo>
//! class __attribute__((annotate("{gen};{funccall};inject_pimpl_method_calls()")))
//!   PimplMethodCallsInjector {};
//! ```

use flex_plugin_api::{DeclarationHandle, GenerationError, TemplateParamKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierSettings {
    /// Implementation class as written in the `impl` default
    pub impl_type: String,
    /// Interface class as written in the `interface` default
    pub interface_type: Option<String>,
}

impl CarrierSettings {
    pub fn from_carrier(carrier: DeclarationHandle<'_>) -> Result<Self, GenerationError> {
        let params = carrier.template_params();
        if params.is_empty() {
            return Err(GenerationError::invalid_input(format!(
                "'{}' must be a class template with an `impl` parameter",
                carrier.qualified_name()
            )));
        }

        let mut impl_type = None;
        let mut interface_type = None;
        for param in params {
            if param.kind != TemplateParamKind::Type || param.is_pack {
                return Err(GenerationError::invalid_input(format!(
                    "template parameter '{}' of '{}' must be a plain type parameter",
                    param.name,
                    carrier.qualified_name()
                )));
            }
            let default = param
                .default
                .as_deref()
                .map(str::trim)
                .filter(|default| !default.is_empty())
                .ok_or_else(|| {
                    GenerationError::invalid_input(format!(
                        "template parameter '{}' of '{}' needs a default type",
                        param.name,
                        carrier.qualified_name()
                    ))
                })?;

            match param.name.as_str() {
                "impl" => impl_type = Some(default.to_string()),
                "interface" => interface_type = Some(default.to_string()),
                other => {
                    return Err(GenerationError::invalid_input(format!(
                        "unknown template parameter '{}' with value '{}'",
                        other, default
                    )))
                }
            }
        }

        let impl_type = impl_type.ok_or_else(|| {
            GenerationError::invalid_input(format!(
                "'{}' has no `impl` template parameter",
                carrier.qualified_name()
            ))
        })?;

        Ok(Self {
            impl_type,
            interface_type,
        })
    }

    /// Resolve the implementation class in the translation unit
    pub fn impl_record<'tu>(
        &self,
        carrier: DeclarationHandle<'tu>,
    ) -> Result<DeclarationHandle<'tu>, GenerationError> {
        carrier
            .translation_unit()
            .find_record(&self.impl_type)
            .ok_or_else(|| {
                GenerationError::missing_context(format!(
                    "implementation class '{}' is not defined in this translation unit",
                    self.impl_type
                ))
            })
    }
}
