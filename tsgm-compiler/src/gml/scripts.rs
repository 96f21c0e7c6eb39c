//! Script headers, parameter prologues and function bodies

use super::{push_line, GmlContext, GmlRenderer, OutputFile};
use crate::error::TranspileError;
use crate::transform::TransformResult;
use tsgm_syntax::{Function, FunctionBody, Ident};

impl<'c, 'a> GmlRenderer<'c, 'a> {
    /// Script `name` running `function`
    pub(super) fn render_script(
        &mut self,
        name: &str,
        function: &Function,
        cx: &GmlContext,
    ) -> TransformResult<OutputFile> {
        let params = parameter_names(function)?;
        let mut content = format!(
            "/// Usage:  {name}({})\n",
            params.iter().map(|param| param.name.as_str()).collect::<Vec<_>>().join(", ")
        );
        if let Some(doc) = &function.jsdoc {
            for line in &doc.description {
                content.push_str(&format!("/// {line}\n"));
            }
        }
        content.push_str(&self.render_function_body(function, cx)?);
        Ok(OutputFile::script(name, content))
    }

    /// Statements of a function, starting with the reads of its arguments
    pub(super) fn render_function_body(&mut self, function: &Function, cx: &GmlContext) -> TransformResult<String> {
        let mut out = String::new();
        for (index, param) in function.params.iter().enumerate() {
            let Some(ident) = param.name.as_ident() else {
                continue;
            };
            let name = &ident.name;
            if param.optional || param.init.is_some() {
                let default = match &param.init {
                    Some(init) => self.render_expression(init, cx)?,
                    None => "undefined".to_string(),
                };
                self.flush_hoisted(&mut out, cx);
                push_line(&mut out, cx, &format!("var {name} = {default};"));
                push_line(&mut out, cx, &format!("if (argument_count > {index})"));
                push_line(&mut out, cx, "{");
                push_line(&mut out, &cx.nested(), &format!("{name} = argument[{index}];"));
                push_line(&mut out, cx, "}");
            } else {
                push_line(&mut out, cx, &format!("var {name} = argument[{index}];"));
            }
        }

        match &function.body {
            Some(FunctionBody::Block(block)) => self.render_block(&block.statements, &mut out, cx)?,
            Some(FunctionBody::Expr(expr)) => {
                let value = self.render_expression(expr, cx)?;
                self.flush_hoisted(&mut out, cx);
                push_line(&mut out, cx, &format!("return {value};"));
            }
            None => {}
        }
        Ok(out)
    }
}

/// Plain parameters of a function; scripts only see positional arguments
fn parameter_names(function: &Function) -> TransformResult<Vec<&Ident>> {
    function
        .params
        .iter()
        .map(|param| {
            if param.rest {
                return Err(TranspileError::unsupported_kind("parameter", "rest parameter", param.span));
            }
            param
                .name
                .as_ident()
                .ok_or_else(|| TranspileError::unsupported_kind("parameter", "binding pattern", param.span))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    #[test]
    fn test_script_header_and_arguments() {
        let gml = script(
            "/**\n * Moves an instance.\n * @param dx offset\n */\nfunction move(dx: number, dy: number) { x += dx; }\ndeclare let x: number;",
            "move",
        );
        assert_eq!(
            gml,
            "/// Usage:  move(dx, dy)\n\
             /// Moves an instance.\n\
             var dx = argument[0];\n\
             var dy = argument[1];\n\
             x += dx;\n"
        );
    }

    #[test]
    fn test_optional_and_default_parameters() {
        let gml = script("function f(a: number, b = 2, c?: number) {}", "f");
        assert_eq!(
            gml,
            "/// Usage:  f(a, b, c)\n\
             var a = argument[0];\n\
             var b = 2;\n\
             if (argument_count > 1)\n\
             {\n    b = argument[1];\n}\n\
             var c = undefined;\n\
             if (argument_count > 2)\n\
             {\n    c = argument[2];\n}\n"
        );
    }

    #[test]
    fn test_unsupported_parameters() {
        assert_eq!(
            error("function f(...rest: number[]) {}"),
            "Unsupported parameter kind: rest parameter"
        );
        assert_eq!(
            error("function f([a, b]: number[]) {}"),
            "Unsupported parameter kind: binding pattern"
        );
    }

    #[test]
    fn test_return_value() {
        let gml = script("function double(n: number) { return n * 2; }", "double");
        assert!(gml.ends_with("var n = argument[0];\nreturn n * 2;\n"), "{gml}");
    }
}
