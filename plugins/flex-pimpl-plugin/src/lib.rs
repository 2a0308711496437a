//! Pimpl plugin for flextool
//!
//! Turns annotated carrier templates into pimpl boilerplate. The carrier's
//! template parameter defaults name the implementation class (`impl`) and,
//! optionally, the interface class (`interface`):
//!
//! ```cpp
//! class Foo {
//!  public:
//!   template<typename impl = example_impl::FooImpl>
//!   class __attribute__((annotate("{gen};{funccall};inject_pimpl_method_calls(without_method_body)")))
//!     PimplMethodDeclsInjector {};
//!
//!  private:
//!   template<typename impl = example_impl::FooImpl>
//!   class __attribute__((annotate("{gen};{funccall};inject_pimpl_storage(size = 64, sizePadding = 8)")))
//!     PimplStorageInjector {};
//! };
//! ```
//!
//! Capabilities:
//! - `reflect-for-pimpl`: checks the implementation class and lists what
//!   will be forwarded
//! - `inject-pimpl-method-calls`: forwarding methods calling `impl_`
//! - `inject-pimpl-storage`: the `::pimpl::FastPimpl` storage member

mod carrier;
mod forwarding;
mod storage;

pub use carrier::CarrierSettings;
pub use forwarding::{forward, forwardable_methods, signature, ForwardingStyle, SKIP_PIMPL};
pub use storage::{StorageArgs, DEFAULT_ALIGNMENT};

use flex_plugin_api::{
    flex_plugin, CapabilityEntry, DeclKind, DeclarationHandle, GeneratedCode, GenerationError,
    GenerationRequest, GenerationResult, KindScope, PluginApiError, PluginDescriptor,
    PluginResult, PluginSettings,
};
use tracing::{debug, info};

pub const PLUGIN_ID: &str = "flex_pimpl_plugin";

flex_plugin! {
    id: PLUGIN_ID,
    entry: descriptor
}

#[cfg(feature = "dynamic")]
flex_plugin_api::export_plugin!(descriptor);

pub fn descriptor() -> PluginDescriptor {
    let carriers = || KindScope::only([DeclKind::Class, DeclKind::Struct]);

    PluginDescriptor::new(PLUGIN_ID, env!("CARGO_PKG_VERSION"))
        .with_metadata(
            "Pimpl",
            "flextool",
            "Generates FastPimpl storage and forwarding methods",
        )
        .thread_safe(true)
        .with_capability(CapabilityEntry::new(
            "reflect-for-pimpl",
            carriers(),
            reflect_for_pimpl,
        ))
        .with_capability(CapabilityEntry::new(
            "inject-pimpl-method-calls",
            carriers(),
            inject_pimpl_method_calls,
        ))
        .with_capability(CapabilityEntry::new(
            "inject-pimpl-storage",
            carriers(),
            inject_pimpl_storage,
        ))
        .on_load(load_settings)
        .on_unload(|| debug!(plugin = PLUGIN_ID, "Unloaded"))
}

fn load_settings(settings: &PluginSettings) -> PluginResult<()> {
    let out_dir = match settings.values.get("outDir") {
        None => None,
        Some(value) if value.is_null() => None,
        Some(value) => Some(value.as_str().ok_or_else(|| {
            PluginApiError::invalid_settings(format!("outDir must be a string, got {}", value))
        })?),
    };

    match out_dir {
        Some(out_dir) => info!(
            plugin = %settings.plugin_id,
            out_dir,
            "Configured output directory (generated files follow the host's --outdir)"
        ),
        None => debug!(
            plugin = %settings.plugin_id,
            out_dir = %settings.output_dir.display(),
            "Using the host output directory"
        ),
    }
    Ok(())
}

/// Carrier settings plus the resolved implementation class with at least
/// one method to forward
fn resolve<'tu>(
    carrier: DeclarationHandle<'tu>,
) -> Result<(CarrierSettings, DeclarationHandle<'tu>), GenerationError> {
    let settings = CarrierSettings::from_carrier(carrier)?;
    let impl_record = settings.impl_record(carrier)?;
    if impl_record.methods().next().is_none() {
        return Err(GenerationError::unsupported(format!(
            "no methods in '{}'",
            impl_record.qualified_name()
        )));
    }
    Ok((settings, impl_record))
}

fn reflect_for_pimpl(request: &GenerationRequest<'_>) -> GenerationResult {
    reject_args(request)?;
    let (settings, impl_record) = resolve(request.declaration)?;

    let methods: Vec<DeclarationHandle<'_>> = forwardable_methods(impl_record).collect();
    if methods.is_empty() {
        debug!(
            class = %impl_record.qualified_name(),
            "All methods were skipped"
        );
    }

    let mut out = format!("// pimpl: {}", settings.impl_type);
    if let Some(interface) = &settings.interface_type {
        out.push_str(&format!(" behind {}", interface));
    }
    out.push_str(&format!(", {} forwarded method(s)\n", methods.len()));
    for method in methods {
        out.push_str("//   ");
        out.push_str(&signature(method, None));
        out.push('\n');
    }
    Ok(vec![GeneratedCode::new(out)])
}

fn inject_pimpl_method_calls(request: &GenerationRequest<'_>) -> GenerationResult {
    let mut without_body = false;
    for arg in &request.invocation.args {
        match (arg.name.as_deref(), arg.value.as_str()) {
            (None, "without_method_body") => without_body = true,
            (name, value) => {
                return Err(GenerationError::invalid_input(format!(
                    "unknown argument '{}' with value '{}'",
                    name.unwrap_or_default(),
                    value
                )))
            }
        }
    }

    let (settings, impl_record) = resolve(request.declaration)?;
    let style = ForwardingStyle {
        interface: settings.interface_type.as_deref(),
        without_body,
    };

    debug!(
        class = %impl_record.qualified_name(),
        interface = ?style.interface,
        without_body,
        "Generating pimpl method calls"
    );
    let code = forwardable_methods(impl_record)
        .map(|method| forward(method, &style))
        .collect::<Result<String, _>>()?;
    Ok(vec![GeneratedCode::new(code)])
}

fn inject_pimpl_storage(request: &GenerationRequest<'_>) -> GenerationResult {
    let settings = CarrierSettings::from_carrier(request.declaration)?;
    let args = StorageArgs::parse(request.invocation)?;
    debug!(
        class = %settings.impl_type,
        size = args.total_size(),
        alignment = args.alignment,
        "Generating pimpl storage"
    );
    Ok(vec![GeneratedCode::new(args.render(&settings.impl_type))])
}

fn reject_args(request: &GenerationRequest<'_>) -> Result<(), GenerationError> {
    match request.invocation.args.first() {
        None => Ok(()),
        Some(arg) => Err(GenerationError::invalid_input(format!(
            "{} takes no arguments, got '{}'",
            request.capability(),
            arg.value
        ))),
    }
}
