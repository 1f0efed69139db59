//! Native `__vx` object the prelude builds `pm` from.
//!
//! Every function takes and returns plain strings, numbers and booleans;
//! structured values cross the boundary as JSON text.

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use rquickjs::function::IntoJsFunc;
use rquickjs::{Ctx, Exception, Function, Object};
use serde::Serialize;
use serde_json::Value;
use vortex_domain::request::normalize_method;
use vortex_domain::{OutboundRequest, VariableScope};

use super::assertions::{self, Subject};
use super::context::ScriptContext;
use super::host::{
    Console, RequestView, ResponseAssertion, ResponseView, ScopeAccessor, TestRecorder,
    VariableCascade,
};
use super::modules;

/// Context shared by every host function of one invocation.
pub type SharedContext = Rc<RefCell<ScriptContext>>;

type JsResult<T> = rquickjs::Result<T>;

fn throw<T>(ctx: &Ctx<'_>, message: impl Display) -> JsResult<T> {
    Err(Exception::throw_message(ctx, &message.to_string()))
}

fn to_json<T: Serialize>(ctx: &Ctx<'_>, value: &T) -> JsResult<String> {
    serde_json::to_string(value).or_else(|e| throw(ctx, e))
}

fn define<'js, P, F>(target: &Object<'js>, name: &str, f: F) -> JsResult<()>
where
    F: IntoJsFunc<'js, P> + 'js,
{
    target.set(name, Function::new(target.ctx().clone(), f)?)
}

fn with_scope<T>(
    ctx: &Ctx<'_>,
    state: &SharedContext,
    name: &str,
    f: impl FnOnce(&mut ScopeAccessor<'_>) -> T,
) -> JsResult<T> {
    let mut guard = state.borrow_mut();
    let accessor = VariableScope::from_name(name)
        .and_then(|scope| ScopeAccessor::for_scope(&mut guard, scope));
    match accessor {
        Some(mut accessor) => Ok(f(&mut accessor)),
        None => throw(ctx, format!("unknown variable scope '{name}'")),
    }
}

fn with_response<T>(
    ctx: &Ctx<'_>,
    state: &SharedContext,
    f: impl FnOnce(ResponseView<'_>) -> JsResult<T>,
) -> JsResult<T> {
    let guard = state.borrow();
    match guard.response.as_ref() {
        Some(response) => f(ResponseView::new(response)),
        None => throw(ctx, "pm.response is only available in post-response scripts"),
    }
}

/// Installs `__vx` on the global object.
///
/// # Errors
///
/// Fails only if the engine cannot allocate the functions.
pub fn install(ctx: &Ctx<'_>, state: &SharedContext) -> JsResult<()> {
    let vx = Object::new(ctx.clone())?;
    install_info(&vx, state)?;
    install_scopes(&vx, state)?;
    install_variables(&vx, state)?;
    install_request(&vx, state)?;
    install_response(&vx, state)?;
    install_cookies(&vx, state)?;
    install_reporting(&vx, state)?;
    install_outbound(&vx, state)?;
    install_modules(&vx)?;
    ctx.globals().set("__vx", vx)
}

fn install_info(vx: &Object<'_>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "mode", move || s.borrow().mode.event_name().to_string())?;
    let s = state.clone();
    define(vx, "requestId", move || s.borrow().request_id.clone())
}

fn install_scopes<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(
        vx,
        "scopeGet",
        move |ctx: Ctx<'js>, scope: String, key: String| {
            with_scope(&ctx, &s, &scope, |acc| acc.get(&key))
        },
    )?;
    let s = state.clone();
    define(
        vx,
        "scopeSet",
        move |ctx: Ctx<'js>, scope: String, key: String, value: String| {
            with_scope(&ctx, &s, &scope, |acc| acc.set(key, value))
        },
    )?;
    let s = state.clone();
    define(
        vx,
        "scopeUnset",
        move |ctx: Ctx<'js>, scope: String, key: String| {
            with_scope(&ctx, &s, &scope, |acc| acc.unset(&key))
        },
    )?;
    let s = state.clone();
    define(
        vx,
        "scopeHas",
        move |ctx: Ctx<'js>, scope: String, key: String| {
            with_scope(&ctx, &s, &scope, |acc| acc.has(&key))
        },
    )?;
    let s = state.clone();
    define(vx, "scopeObject", move |ctx: Ctx<'js>, scope: String| {
        let snapshot = with_scope(&ctx, &s, &scope, |acc| acc.to_object())?;
        to_json(&ctx, &snapshot)
    })?;
    let s = state.clone();
    define(vx, "scopeClear", move |ctx: Ctx<'js>, scope: String| {
        with_scope(&ctx, &s, &scope, |acc| acc.clear())
    })
}

fn install_variables<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "varsGet", move |key: String| {
        VariableCascade::new(&mut s.borrow_mut()).get(&key)
    })?;
    let s = state.clone();
    define(vx, "varsSet", move |key: String, value: String| {
        VariableCascade::new(&mut s.borrow_mut()).set(key, value);
    })?;
    let s = state.clone();
    define(vx, "varsHas", move |key: String| {
        VariableCascade::new(&mut s.borrow_mut()).has(&key)
    })?;
    let s = state.clone();
    define(vx, "varsObject", move |ctx: Ctx<'js>| {
        let merged = VariableCascade::new(&mut s.borrow_mut()).to_object();
        to_json(&ctx, &merged)
    })?;
    let s = state.clone();
    define(vx, "replaceIn", move |template: String| {
        VariableCascade::new(&mut s.borrow_mut()).replace_in(&template)
    })
}

fn install_request<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "requestGet", move |ctx: Ctx<'js>, field: String| {
        let mut guard = s.borrow_mut();
        let view = RequestView::new(&mut guard.request);
        match field.as_str() {
            "url" => Ok(view.url().to_string()),
            "method" => Ok(view.method().to_string()),
            "body" => Ok(view.body().to_string()),
            other => throw(&ctx, format!("unknown request field '{other}'")),
        }
    })?;
    let s = state.clone();
    define(
        vx,
        "requestSet",
        move |ctx: Ctx<'js>, field: String, value: String| {
            let mut guard = s.borrow_mut();
            let mut view = RequestView::new(&mut guard.request);
            match field.as_str() {
                "url" => view.set_url(value),
                "method" => view.set_method(&value),
                "body" => view.set_body(value),
                other => return throw(&ctx, format!("unknown request field '{other}'")),
            }
            Ok(())
        },
    )?;
    let s = state.clone();
    define(vx, "headerGet", move |name: String| {
        s.borrow().request.headers.get(&name).map(str::to_string)
    })?;
    let s = state.clone();
    define(vx, "headerSet", move |name: String, value: String| {
        RequestView::new(&mut s.borrow_mut().request)
            .headers()
            .upsert(name, value);
    })?;
    let s = state.clone();
    define(vx, "headerRemove", move |name: String| {
        RequestView::new(&mut s.borrow_mut().request)
            .headers()
            .remove(&name);
    })?;
    let s = state.clone();
    define(vx, "headerHas", move |name: String| {
        s.borrow().request.headers.contains(&name)
    })?;
    let s = state.clone();
    define(vx, "headerObject", move |ctx: Ctx<'js>| {
        to_json(&ctx, &s.borrow().request.headers.to_map())
    })
}

fn install_response<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "responseJson", move |ctx: Ctx<'js>| {
        with_response(&ctx, &s, |view| Ok(view.to_json().to_string()))
    })?;
    let s = state.clone();
    define(vx, "responseParseJson", move |ctx: Ctx<'js>| {
        with_response(&ctx, &s, |view| match view.json() {
            Ok(value) => Ok(value.to_string()),
            Err(message) => throw(&ctx, message),
        })
    })?;
    let s = state.clone();
    define(
        vx,
        "responseAssert",
        move |ctx: Ctx<'js>, kind: String, args: String, negate: bool| {
            let args: Vec<Value> = match serde_json::from_str(&args) {
                Ok(args) => args,
                Err(e) => return throw(&ctx, e),
            };
            let assertion = match ResponseAssertion::from_call(&kind, &args) {
                Ok(assertion) => assertion,
                Err(message) => return throw(&ctx, message),
            };
            with_response(&ctx, &s, |view| Ok(view.check(&assertion, negate)))
        },
    )
}

fn install_cookies<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "cookieGet", move |name: String| {
        s.borrow().cookies.get(&name).map(str::to_string)
    })?;
    let s = state.clone();
    define(vx, "cookieSet", move |name: String, value: String| {
        s.borrow_mut().cookies.set(name, value);
    })?;
    let s = state.clone();
    define(vx, "cookieHas", move |name: String| {
        s.borrow().cookies.has(&name)
    })?;
    let s = state.clone();
    define(vx, "cookieRemove", move |name: String| {
        s.borrow_mut().cookies.remove(&name);
    })?;
    let s = state.clone();
    define(vx, "cookieClear", move || s.borrow_mut().cookies.clear())?;
    let s = state.clone();
    define(vx, "cookieObject", move |ctx: Ctx<'js>| {
        to_json(&ctx, &s.borrow().cookies.to_map())
    })
}

fn install_reporting<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "log", move |method: String, message: String| {
        Console::new(&mut s.borrow_mut().console).write(&method, message);
    })?;
    let s = state.clone();
    define(
        vx,
        "testRecord",
        move |name: String, passed: bool, error: Option<String>| {
            let error = (!passed).then(|| error.unwrap_or_else(|| "test failed".to_string()));
            TestRecorder::new(&mut s.borrow_mut().tests).record(name, error);
        },
    )?;
    define(
        vx,
        "expect",
        move |ctx: Ctx<'js>, op: String, actual: String, args: String, negate: bool| {
            let actual: Subject = match serde_json::from_str(&actual) {
                Ok(subject) => subject,
                Err(e) => return throw(&ctx, e),
            };
            let args: Vec<Subject> = match serde_json::from_str(&args) {
                Ok(args) => args,
                Err(e) => return throw(&ctx, e),
            };
            assertions::evaluate(&op, &actual, &args, negate).or_else(|e| throw(&ctx, e))
        },
    )
}

fn install_outbound<'js>(vx: &Object<'js>, state: &SharedContext) -> JsResult<()> {
    let s = state.clone();
    define(vx, "sendRequest", move |ctx: Ctx<'js>, options: String| {
        let mut request: OutboundRequest = match serde_json::from_str(&options) {
            Ok(request) => request,
            Err(e) => return throw(&ctx, format!("invalid sendRequest options: {e}")),
        };
        request.method = normalize_method(&request.method);
        Ok(s.borrow_mut().enqueue(request))
    })
}

fn install_modules<'js>(vx: &Object<'js>) -> JsResult<()> {
    define(vx, "uuid", |version: i32| {
        modules::uuid(u8::try_from(version).unwrap_or(4))
    })?;
    define(
        vx,
        "momentFormat",
        |ctx: Ctx<'js>, millis: f64, pattern: Option<String>| {
            modules::format_moment(millis, pattern.as_deref()).or_else(|e| throw(&ctx, e))
        },
    )?;
    define(vx, "btoa", |ctx: Ctx<'js>, text: String| {
        modules::btoa(&text).or_else(|e| throw(&ctx, e))
    })?;
    define(vx, "atob", |ctx: Ctx<'js>, text: String| {
        modules::atob(&text).or_else(|e| throw(&ctx, e))
    })
}
