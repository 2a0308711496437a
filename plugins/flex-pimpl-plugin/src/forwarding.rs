//! Forwarding methods from an interface class to its implementation

use flex_plugin_api::{
    Access, DeclarationHandle, GenerationError, Param, TemplateParam, TemplateParamKind,
};

/// Methods annotated with this token are never forwarded
pub const SKIP_PIMPL: &str = "skip_pimpl";

/// Public, ordinary methods of the implementation class in declaration order
pub fn forwardable_methods<'tu>(
    impl_record: DeclarationHandle<'tu>,
) -> impl Iterator<Item = DeclarationHandle<'tu>> + 'tu {
    impl_record.methods().filter(|method| {
        let Some(info) = method.function() else {
            return false;
        };
        method.access() == Access::Public
            && !info.is_ctor
            && !info.is_dtor
            && !info.is_operator
            && !method.has_annotation(SKIP_PIMPL)
    })
}

/// How forwarded methods are printed
#[derive(Debug, Clone, Default)]
pub struct ForwardingStyle<'a> {
    /// Qualifies the method names (`Foo::bar`) for out-of-class definitions
    pub interface: Option<&'a str>,
    /// Print declarations only
    pub without_body: bool,
}

/// `int foo(int&& a, const int& b) const noexcept`, optionally qualified
pub fn signature(method: DeclarationHandle<'_>, interface: Option<&str>) -> String {
    let mut out = String::new();
    if method.is_template() {
        out.push_str("template<");
        out.push_str(&template_header(method.template_params()));
        out.push_str("> ");
    }

    let Some(info) = method.function() else {
        return out;
    };
    if info.is_static && interface.is_none() {
        out.push_str("static ");
    }
    if info.is_constexpr {
        out.push_str("constexpr ");
    }
    out.push_str(info.return_type.as_deref().unwrap_or("void"));
    out.push(' ');
    if let Some(interface) = interface {
        out.push_str(interface);
        out.push_str("::");
    }
    out.push_str(method.name());
    out.push('(');
    out.push_str(
        &info
            .params
            .iter()
            .map(|param| param.full.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    out.push(')');
    if info.is_const {
        out.push_str(" const");
    }
    if info.is_noexcept {
        out.push_str(" noexcept");
    }
    out
}

/// One forwarded method: the signature, then either `;` or a body calling
/// `impl_`. A body cannot be generated for a method with unnamed parameters.
pub fn forward(
    method: DeclarationHandle<'_>,
    style: &ForwardingStyle<'_>,
) -> Result<String, GenerationError> {
    let mut out = signature(method, style.interface);
    if style.without_body {
        out.push_str(";\n");
        return Ok(out);
    }

    let params = method.function().map(|info| info.params.as_slice()).unwrap_or_default();
    if let Some(position) = params.iter().position(|param| param.name.is_empty()) {
        return Err(GenerationError::unsupported(format!(
            "parameter {} of '{}' has no name and cannot be forwarded",
            position + 1,
            method.qualified_name()
        )));
    }
    let args = params.iter().map(call_arg).collect::<Vec<_>>().join(", ");

    out.push_str(&format!(
        "\n{{\n return impl_->{}({});\n}}\n",
        method.name(),
        args
    ));
    Ok(out)
}

/// `std::move(value)`, `std::forward<Args>(args)...` or the bare name
fn call_arg(param: &Param) -> String {
    if let Some(element) = param.pack_type() {
        return format!("std::forward<{}>({})...", element, param.name);
    }
    let arg = if param.needs_move() {
        format!("std::move({})", param.name)
    } else {
        param.name.clone()
    };
    if param.is_pack {
        format!("{}...", arg)
    } else {
        arg
    }
}

fn template_header(params: &[TemplateParam]) -> String {
    params
        .iter()
        .map(|param| {
            let pack = if param.is_pack { "..." } else { "" };
            match param.kind {
                TemplateParamKind::Type => format!("typename{} {}", pack, param.name),
                TemplateParamKind::NonType => format!("auto{} {}", pack, param.name),
                TemplateParamKind::Template => {
                    format!("template<typename...> class{} {}", pack, param.name)
                }
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(kind: TemplateParamKind, name: &str, is_pack: bool) -> TemplateParam {
        TemplateParam {
            kind,
            name: name.to_string(),
            default: Some("ignored".to_string()),
            is_pack,
        }
    }

    fn function_param(type_name: &str, name: &str) -> Param {
        Param {
            type_name: type_name.to_string(),
            name: name.to_string(),
            full: format!("{} {}", type_name, name),
            default_value: None,
            is_rvalue_ref: type_name.contains("&&"),
            is_by_value_class: false,
            is_pack: type_name.ends_with("..."),
        }
    }

    #[test]
    fn test_call_args() {
        assert_eq!(call_arg(&function_param("int", "n")), "n");
        assert_eq!(call_arg(&function_param("int&&", "n")), "std::move(n)");
        assert_eq!(
            call_arg(&function_param("Args&&...", "args")),
            "std::forward<Args>(args)..."
        );
        assert_eq!(call_arg(&function_param("const Args&...", "args")), "args...");
    }

    #[test]
    fn test_template_header_drops_defaults() {
        assert_eq!(
            template_header(&[
                param(TemplateParamKind::Type, "T", false),
                param(TemplateParamKind::NonType, "N", false),
                param(TemplateParamKind::Type, "Args", true),
            ]),
            "typename T, auto N, typename... Args"
        );
    }
}
