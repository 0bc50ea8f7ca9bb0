//! Cross-module flow tests: dispatch, registry, and gated fields together.

#[cfg(test)]
mod flow_tests {
    use crate::accessor::{FieldError, TriggerOptions};
    use crate::action::ActionDef;
    use crate::compose::{ComposeOptions, FieldComposer, FieldRules};
    use crate::dispatch::ActionContext;
    use crate::form::FormHandle;
    use crate::gate::ChangeGate;
    use crate::registry::DispatchRegistry;
    use crate::testing::{FormFixture, ManualGate};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Services {
        tenant: &'static str,
    }

    /// A submit-shaped flow: validate everything, then either collect the
    /// values or surface a cross-field error.
    fn submit_action() -> ActionDef<(), Services, futures::future::BoxFuture<'static, Option<Value>>>
    {
        use futures::FutureExt;
        ActionDef::new(|(), ctx: ActionContext<Services>| {
            async move {
                if !ctx.trigger(None, TriggerOptions::default()).await {
                    ctx.set_error(
                        "form",
                        FieldError::with_message("submit", "fix the highlighted fields"),
                    );
                    return None;
                }
                ctx.clear_errors(None);
                Some(ctx.get_values(None))
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn submit_flow_over_a_mounted_form() {
        let fixture = Arc::new(FormFixture::new());
        let registry = DispatchRegistry::new();
        let handle = FormHandle::new(fixture.clone(), Services { tenant: "acme" });
        let guard = handle.mount(&registry);

        // A composed field with a required rule, filled through the field.
        let composer: FieldComposer<Value> =
            FieldComposer::new(FieldRules::required("name is required"));
        let field = composer.compose(&fixture, ComposeOptions::new("name"));

        let submit = submit_action().bind(&registry, guard.form()).unwrap();

        // Empty: validation fails and the action records a submit error.
        assert!(submit.call(()).await.is_none());
        assert_eq!(fixture.error("form").unwrap().kind, "submit");

        // Filled through the controlled field: submit succeeds.
        assert!(field.on_change(json!("Ada")).admitted().await);
        let values = submit.call(()).await.unwrap();
        assert_eq!(values["name"], json!("Ada"));
        assert!(fixture.error("form").is_none());
    }

    #[tokio::test]
    async fn nested_dispatch_inside_an_async_action() {
        let fixture = Arc::new(FormFixture::new());
        let handle = FormHandle::new(fixture.clone(), Services { tenant: "acme" });

        let normalize = ActionDef::new(|path: &'static str, ctx: ActionContext<Services>| {
            let value = ctx.get_values(Some(path));
            if let Some(text) = value.as_str() {
                ctx.set_value(path, json!(text.trim().to_lowercase()));
            }
        });

        let outer = handle
            .dispatch()
            .dispatch(|ctx: ActionContext<Services>| async move {
                ctx.set_value("email", json!("  Ada@Example.COM "));
                // Nested dispatch of the reusable action through the context.
                ctx.dispatch(normalize.create("email"));
                ctx.trigger(Some("email"), TriggerOptions::default()).await
            });
        assert!(outer.await);

        assert_eq!(fixture.value("email"), Some(json!("ada@example.com")));
    }

    #[tokio::test]
    async fn pending_admissions_share_the_accessor_with_actions() {
        let fixture = Arc::new(FormFixture::new());
        let handle = FormHandle::new(fixture.clone(), Services { tenant: "acme" });
        let gate = ManualGate::new();

        let composer: FieldComposer<Value> = FieldComposer::default();
        let field = composer.compose(
            &fixture,
            ComposeOptions::new("status")
                .with_default_value(json!("draft"))
                .with_gate(gate.clone() as Arc<dyn ChangeGate<Value>>),
        );

        // Propose a change, then run an action against the same field while
        // the admission is still pending.
        let ticket = field.on_change(json!("published"));
        gate.wait_for(1).await;
        handle.dispatch().dispatch(|ctx: ActionContext<Services>| {
            ctx.set_value("status", json!("review"));
        });
        assert_eq!(fixture.value("status"), Some(json!("review")));

        // The late resolution applies over the action's write: last wins.
        gate.resolve(0, true);
        assert!(ticket.admitted().await);
        assert_eq!(fixture.value("status"), Some(json!("published")));
    }

    #[tokio::test]
    async fn bound_actions_use_the_extra_context() {
        let fixture = Arc::new(FormFixture::new());
        let registry = DispatchRegistry::new();
        let handle = FormHandle::new(fixture.clone(), Services { tenant: "acme" });
        let guard = handle.mount(&registry);

        let scope_path = ActionDef::new(|field: &'static str, ctx: ActionContext<Services>| {
            let scoped = format!("{}.{}", ctx.extra().tenant, field);
            ctx.set_value(&scoped, json!(true));
            scoped
        });

        let bound = scope_path.bind(&registry, guard.form()).unwrap();
        assert_eq!(bound.call("active"), "acme.active");
        assert_eq!(fixture.value("acme.active"), Some(json!(true)));
    }
}
