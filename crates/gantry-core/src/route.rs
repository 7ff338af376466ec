//! Route entries and their binding plans.

use std::fmt;
use std::sync::Arc;

use gantry_router::{MethodSet, PathPattern};
use tracing::warn;

use crate::descriptor::{ParamDescriptor, ParamSource};
use crate::error::{ExtractionError, ExtractionErrorKind, RegistrationError};
use crate::handler::{Argument, Binder, BoxedArg, Callable, ParamSpec, Slot};
use crate::{RequestContext, ResponseWriter};

#[derive(Clone, Copy)]
enum PlanSlot {
    Custom { descriptor: usize, binder: Binder },
    Response,
    Request,
}

/// A per-route plan mapping handler positions to their value sources.
///
/// Built once at registration from the handler's declared parameters and
/// the registered descriptors, so no type inspection happens per request.
#[derive(Clone)]
pub struct BindingPlan {
    slots: Vec<PlanSlot>,
}

impl BindingPlan {
    /// Validates `specs` against `descriptors` and builds the plan.
    ///
    /// Value-object descriptors without explicit fields receive the fields
    /// declared by their parameter type.
    pub fn build(
        path: &str,
        specs: &[ParamSpec],
        descriptors: &mut [ParamDescriptor],
    ) -> Result<Self, RegistrationError> {
        if let Some((position, spec)) = specs
            .iter()
            .enumerate()
            .find(|(_, s)| s.slot() == Slot::Unsupported)
        {
            return Err(unsupported(path, position, spec));
        }

        let custom = specs
            .iter()
            .filter(|s| matches!(s.slot(), Slot::Custom(_)))
            .count();
        if custom != descriptors.len() {
            return Err(RegistrationError::ArityMismatch {
                path: path.to_string(),
                expected: custom,
                registered: descriptors.len(),
            });
        }

        let mut slots = Vec::with_capacity(specs.len());
        let mut next = 0usize;
        for (position, spec) in specs.iter().enumerate() {
            match spec.slot() {
                Slot::Response => slots.push(PlanSlot::Response),
                Slot::Request => slots.push(PlanSlot::Request),
                Slot::Unsupported => return Err(unsupported(path, position, spec)),
                Slot::Custom(shape) => {
                    let descriptor = &mut descriptors[next];
                    if !shape.accepts(descriptor.source()) {
                        return Err(RegistrationError::IncompatibleSource {
                            path: path.to_string(),
                            position: next,
                            name: descriptor.name().to_string(),
                            source_kind: descriptor.source().to_string(),
                            type_name: spec.type_name(),
                        });
                    }
                    if descriptor.source() == ParamSource::ValueObject
                        && descriptor.fields().is_empty()
                    {
                        if let Some(fields) = spec.fields() {
                            *descriptor = descriptor.clone().with_fields(fields.to_vec());
                        }
                    }
                    slots.push(PlanSlot::Custom {
                        descriptor: next,
                        binder: spec.binder(),
                    });
                    next += 1;
                }
            }
        }

        Ok(Self { slots })
    }

    /// Converts resolved arguments into typed values, one per descriptor.
    ///
    /// With `lenient` set, a value that fails to decode is logged and bound
    /// as if it were absent instead of failing the request.
    pub fn bind(
        &self,
        arguments: Vec<Argument>,
        descriptors: &[ParamDescriptor],
        lenient: bool,
    ) -> Result<Vec<BoxedArg>, ExtractionError> {
        let mut arguments = arguments.into_iter();
        let mut bound = Vec::with_capacity(descriptors.len());
        for slot in &self.slots {
            let PlanSlot::Custom { descriptor, binder } = *slot else {
                continue;
            };
            let descriptor = &descriptors[descriptor];
            let argument = arguments.next().unwrap_or(Argument::Absent);
            let value = match binder(argument, descriptor) {
                Err(err) if lenient && err.kind() == ExtractionErrorKind::DeserializationFailed => {
                    warn!(parameter = descriptor.name(), error = %err, "leaving undecodable parameter unresolved");
                    binder(Argument::Absent, descriptor)?
                }
                other => other?,
            };
            bound.push(value);
        }
        Ok(bound)
    }

    /// Interleaves transport values with bound custom values in handler
    /// order.
    #[must_use]
    pub fn assemble(
        &self,
        bound: Vec<BoxedArg>,
        request: &RequestContext,
        response: &ResponseWriter,
    ) -> Vec<BoxedArg> {
        let mut bound = bound.into_iter();
        let mut args: Vec<BoxedArg> = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match slot {
                PlanSlot::Response => args.push(Box::new(response.clone())),
                PlanSlot::Request => args.push(Box::new(request.clone())),
                PlanSlot::Custom { .. } => {
                    if let Some(value) = bound.next() {
                        args.push(value);
                    }
                }
            }
        }
        args
    }

    /// Total number of handler parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the handler takes no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for BindingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<String> = self
            .slots
            .iter()
            .map(|slot| match slot {
                PlanSlot::Custom { descriptor, .. } => format!("custom#{descriptor}"),
                PlanSlot::Response => "response".to_string(),
                PlanSlot::Request => "request".to_string(),
            })
            .collect();
        f.debug_struct("BindingPlan").field("slots", &slots).finish()
    }
}

/// One registered path-to-handler binding.
///
/// Immutable once built; lives in the route table for the process lifetime.
pub struct RouteEntry {
    path: String,
    pattern: PathPattern,
    handler: Arc<dyn Callable>,
    methods: MethodSet,
    params: Vec<ParamDescriptor>,
    plan: BindingPlan,
}

impl RouteEntry {
    /// Builds an entry, validating the handler signature against the
    /// descriptors.
    pub fn new(
        path: impl Into<String>,
        handler: Arc<dyn Callable>,
        methods: MethodSet,
        mut params: Vec<ParamDescriptor>,
    ) -> Result<Self, RegistrationError> {
        let path = path.into();
        let pattern = PathPattern::parse(&path)?;
        let plan = BindingPlan::build(&path, handler.params(), &mut params)?;
        Ok(Self {
            path,
            pattern,
            handler,
            methods,
            params,
            plan,
        })
    }

    /// Normalized path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Compiled template.
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The bound handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Callable> {
        &self.handler
    }

    /// Allowed methods.
    #[must_use]
    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// Custom parameter descriptors in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// The binding plan.
    #[must_use]
    pub fn plan(&self) -> &BindingPlan {
        &self.plan
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("path", &self.path)
            .field("handler", &self.handler.name())
            .field("methods", &self.methods)
            .field("params", &self.params)
            .field("plan", &self.plan)
            .finish()
    }
}

fn unsupported(path: &str, position: usize, spec: &ParamSpec) -> RegistrationError {
    RegistrationError::UnsupportedParameter {
        path: path.to_string(),
        position,
        type_name: spec.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;
    use crate::handler::{Bind, Body, BoxedHandler, Handler, ReturnValue};
    use crate::ValueObject;
    use http::Method;
    use serde::Deserialize;

    fn callable<H: Handler<A>, A: 'static>(handler: H) -> Arc<dyn Callable> {
        Arc::new(BoxedHandler::new(handler))
    }

    #[derive(Debug, Deserialize)]
    struct Person {
        name: String,
    }

    #[test]
    fn test_arity_mismatch() {
        let err = RouteEntry::new(
            "/users",
            callable(|_: i64, _: String| ()),
            MethodSet::new(),
            vec![ParamDescriptor::param("id")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::ArityMismatch {
                expected: 2,
                registered: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_optional_transport_rejected_at_registration() {
        let err = RouteEntry::new(
            "/w",
            callable(|_: i64, writer: Option<ResponseWriter>| writer.is_some()),
            MethodSet::new(),
            vec![ParamDescriptor::param("n")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::UnsupportedParameter { position: 1, .. }
        ));
        assert!(err.to_string().contains("Option"), "{err}");

        let err = RouteEntry::new(
            "/r",
            callable(|request: Option<RequestContext>| request.is_some()),
            MethodSet::new(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::UnsupportedParameter { position: 0, .. }
        ));
    }

    #[test]
    fn test_transport_params_not_counted() {
        let entry = RouteEntry::new(
            "/users",
            callable(|_: ResponseWriter, _: i64, _: RequestContext| ()),
            MethodSet::new(),
            vec![ParamDescriptor::param("id")],
        )
        .unwrap();
        assert_eq!(entry.plan().len(), 3);
        assert_eq!(entry.params().len(), 1);
    }

    #[test]
    fn test_incompatible_source() {
        let err = RouteEntry::new(
            "/users",
            callable(|_: Body<Person>| ()),
            MethodSet::new(),
            vec![ParamDescriptor::header("Token")],
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::IncompatibleSource { position: 0, .. }));
    }

    #[test]
    fn test_invalid_path() {
        let err = RouteEntry::new("/users/{id", callable(|| ()), MethodSet::new(), Vec::new())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPath(_)));
    }

    #[derive(Debug, Deserialize)]
    struct Filter {
        q: String,
    }

    impl ValueObject for Filter {
        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::new("q").required()]
        }
    }

    #[test]
    fn test_value_object_fields_filled_from_type() {
        let entry = RouteEntry::new(
            "/search",
            callable(|f: Bind<Filter>| f.q.clone()),
            MethodSet::new(),
            vec![ParamDescriptor::value_object("filter")],
        )
        .unwrap();
        assert_eq!(entry.params()[0].fields().len(), 1);
        assert!(entry.params()[0].fields()[0].is_required());
    }

    #[test]
    fn test_bind_and_assemble_in_handler_order() {
        let entry = RouteEntry::new(
            "/users/{id}",
            callable(|id: i64, writer: ResponseWriter, ctx: RequestContext| {
                writer.insert_header("x-path", ctx.path());
                id * 2
            }),
            MethodSet::single(Method::GET),
            vec![ParamDescriptor::path_variable("id")],
        )
        .unwrap();

        let bound = entry
            .plan()
            .bind(vec![Argument::Text("21".into())], entry.params(), false)
            .unwrap();
        let request = RequestContext::new(Method::GET, "/users/21".parse().unwrap());
        let response = ResponseWriter::new();
        let args = entry.plan().assemble(bound, &request, &response);

        let values = entry.handler().invoke(args).unwrap().into_values();
        assert!(matches!(&values[0], ReturnValue::Payload(Some(v)) if v == 42));
        assert_eq!(response.header("x-path").as_deref(), Some("/users/21"));
    }

    #[test]
    fn test_bind_propagates_errors() {
        let entry = RouteEntry::new(
            "/n",
            callable(|_: u8| ()),
            MethodSet::new(),
            vec![ParamDescriptor::param("n")],
        )
        .unwrap();
        let err = entry
            .plan()
            .bind(vec![Argument::Text("300".into())], entry.params(), false)
            .unwrap_err();
        assert_eq!(err.kind(), ExtractionErrorKind::InvalidType);
    }

    #[test]
    fn test_lenient_bind_leaves_body_unresolved() {
        let entry = RouteEntry::new(
            "/people",
            callable(|p: Option<Body<Person>>| p.map(|p| p.into_inner().name)),
            MethodSet::single(Method::POST),
            vec![ParamDescriptor::body("person")],
        )
        .unwrap();
        let bad = vec![Argument::Structured(serde_json::json!({"unexpected": true}))];

        assert!(entry.plan().bind(bad.clone(), entry.params(), false).is_err());

        let bound = entry.plan().bind(bad, entry.params(), true).unwrap();
        let request = RequestContext::new(Method::POST, "/people".parse().unwrap());
        let args = entry.plan().assemble(bound, &request, &ResponseWriter::new());
        let values = entry.handler().invoke(args).unwrap().into_values();
        assert!(matches!(&values[0], ReturnValue::Payload(None)));
    }
}
