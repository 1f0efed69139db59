//! End-to-end tests for the QuickJS script engine
//!
//! Scripts run against an in-memory HTTP executor so `pm.sendRequest` can be
//! observed without a network.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use vortex_application::ports::{HttpExecutor, HttpExecutorError};
use vortex_application::{ResourceLimit, ScriptError};
use vortex_domain::{
    ConsoleLevel, HeaderMap, HttpResponse, OutboundRequest, PostResponseInput, PreRequestInput,
    RequestDescriptor, ResponseDescriptor, Script, ScriptSettings, VariableMap,
};
use vortex_infrastructure::QuickJsScriptEngine;

/// Echoes the request back as JSON and records every URL it was asked for.
#[derive(Debug, Default)]
struct EchoHttp {
    calls: Mutex<Vec<String>>,
}

impl EchoHttp {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpExecutor for EchoHttp {
    async fn execute(&self, request: &OutboundRequest) -> Result<HttpResponse, HttpExecutorError> {
        self.calls.lock().unwrap().push(request.url.clone());
        if request.url.contains("refused.test") {
            return Err(HttpExecutorError::ConnectionFailed("connection refused".into()));
        }
        if request.url.ends_with("/slow") {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let body = serde_json::json!({
            "url": request.url,
            "method": request.method,
            "body": request.body,
            "cookie": request.headers.get("cookie"),
        })
        .to_string();
        let headers: HeaderMap = [("Content-Type", "application/json")].into_iter().collect();
        Ok(HttpResponse::new(
            200,
            headers,
            body.as_bytes(),
            Duration::from_millis(7),
        ))
    }
}

fn engine(settings: ScriptSettings) -> (QuickJsScriptEngine<EchoHttp>, Arc<EchoHttp>) {
    let http = Arc::new(EchoHttp::default());
    (QuickJsScriptEngine::new(Arc::clone(&http), settings), http)
}

fn vars(pairs: &[(&str, &str)]) -> VariableMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn pre_input() -> PreRequestInput {
    PreRequestInput {
        request: RequestDescriptor::get("https://api.test/users")
            .with_header("Accept", "application/json")
            .with_param("page", "1"),
        environment: vars(&[("token", "t-1")]),
        collection_variables: vars(&[("version", "v2")]),
        globals: VariableMap::new(),
    }
}

fn post_input(response: ResponseDescriptor) -> PostResponseInput {
    PostResponseInput {
        response,
        environment: VariableMap::new(),
        collection_variables: VariableMap::new(),
        globals: VariableMap::new(),
    }
}

fn json_response(status: u16, body: &str) -> ResponseDescriptor {
    ResponseDescriptor::new(status, body, 42.5).with_header("Content-Type", "application/json")
}

#[tokio::test]
async fn test_scopes_are_isolated_and_cascade_prefers_local() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.environment.set('k', 'env');
        pm.collectionVariables.set('k', 'collection');
        pm.globals.set('k', 'global');
        pm.variables.set('k', 'local');
        pm.environment.set('seen', pm.variables.get('k'));
        pm.variables.set('scratch', 'tmp');
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(output.environment.get("k").unwrap(), "env");
    assert_eq!(output.collection_variables.get("k").unwrap(), "collection");
    assert_eq!(output.globals.get("k").unwrap(), "global");
    assert_eq!(output.environment.get("seen").unwrap(), "local");
    for scope in [
        &output.environment,
        &output.collection_variables,
        &output.globals,
    ] {
        assert!(!scope.contains_key("scratch"));
    }
}

#[tokio::test]
async fn test_cascade_falls_through_in_priority_order() {
    let (engine, _) = engine(ScriptSettings::default());
    let mut input = pre_input();
    input.environment = vars(&[("a", "env"), ("b", "env"), ("c", "env")]);
    input.collection_variables = vars(&[("a", "collection"), ("b", "collection")]);
    input.globals = vars(&[("a", "global")]);
    let script = Script::with_content(
        r"
        pm.environment.set('ra', pm.variables.get('a'));
        pm.environment.set('rb', pm.variables.get('b'));
        pm.environment.set('rc', pm.variables.get('c'));
        pm.environment.set('rd', String(pm.variables.get('d')));
        pm.environment.set('hasD', pm.variables.has('d'));
        ",
    );

    let output = engine.execute_pre_request(&script, input).await.unwrap();

    assert_eq!(output.environment.get("ra").unwrap(), "global");
    assert_eq!(output.environment.get("rb").unwrap(), "collection");
    assert_eq!(output.environment.get("rc").unwrap(), "env");
    assert_eq!(output.environment.get("rd").unwrap(), "undefined");
    assert_eq!(output.environment.get("hasD").unwrap(), "false");
}

#[tokio::test]
async fn test_scope_writes_are_coerced_to_strings() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.environment.set('n', 42);
        pm.environment.set('b', true);
        pm.globals.set('o', { a: 1 });
        pm.environment.unset('token');
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(output.environment.get("n").unwrap(), "42");
    assert_eq!(output.environment.get("b").unwrap(), "true");
    assert_eq!(output.globals.get("o").unwrap(), r#"{"a":1}"#);
    assert!(!output.environment.contains_key("token"));
}

#[tokio::test]
async fn test_request_mutation_roundtrip() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r#"
        pm.request.url = 'https://api.test/orders';
        pm.request.method = 'post';
        pm.request.body.raw = '{"id":7}';
        pm.request.headers.add({ key: 'X-Trace', value: 'abc' });
        pm.request.headers.upsert('Authorization', 'Bearer ' + pm.environment.get('token'));
        pm.request.headers.remove('Accept');
        "#,
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(output.url, "https://api.test/orders");
    assert_eq!(output.method, "POST");
    assert_eq!(output.body, r#"{"id":7}"#);
    assert_eq!(output.headers.get("x-trace"), Some("abc"));
    assert_eq!(output.headers.get("Authorization"), Some("Bearer t-1"));
    assert!(!output.headers.contains("Accept"));
    assert_eq!(output.params.get("page").unwrap(), "1");
}

#[tokio::test]
async fn test_test_results_are_captured_in_order() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.test('passes', () => { pm.expect(1).to.equal(1); });
        pm.test('fails', () => { pm.expect(1).to.equal(2); });
        ",
    );

    let output = engine
        .execute_post_response(&script, post_input(json_response(200, "{}")))
        .await
        .unwrap();

    assert_eq!(output.test_results.len(), 2);
    assert_eq!(output.test_results[0].name, "passes");
    assert!(output.test_results[0].passed);
    assert_eq!(output.test_results[0].error, None);
    assert!(!output.test_results[1].passed);
    let error = output.test_results[1].error.as_deref().unwrap();
    assert!(error.contains('1') && error.contains('2'), "{error}");
    assert!(!output.all_passed());
}

#[tokio::test]
async fn test_expect_chains() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        const body = pm.response.json();
        pm.test('shape', () => {
            pm.expect(body).to.be.an('object').and.to.have.property('items');
            pm.expect(body.items).to.have.lengthOf(3).and.to.include(2);
            pm.expect(body.items).to.eql([1, 2, 3]);
            pm.expect(body.name).to.match(/^ali/);
            pm.expect(body.count).to.be.above(2).and.below(4);
            pm.expect(body.missing).to.be.undefined;
            pm.expect(body.name).to.not.equal('bob');
            pm.expect('b').to.be.oneOf(['a', 'b']);
            pm.expect(body).to.have.keys('items', 'name', 'count');
            pm.expect(body.items).to.have.members([3, 1, 2]);
        });
        pm.test('negated failure', () => {
            pm.expect(body.items).to.not.include(2);
        });
        ",
    );
    let response = json_response(200, r#"{"items":[1,2,3],"name":"alice","count":3}"#);

    let output = engine
        .execute_post_response(&script, post_input(response))
        .await
        .unwrap();

    assert!(output.test_results[0].passed, "{:?}", output.test_results[0]);
    assert!(!output.test_results[1].passed);
    assert!(
        output.test_results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("not include")
    );
}

#[tokio::test]
async fn test_response_assertions() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.test('status', () => pm.response.to.have.status(201));
        pm.test('success', () => { pm.response.to.be.success; });
        pm.test('header', () => pm.response.to.have.header('Content-Type', 'application/json'));
        pm.test('json path', () => pm.response.to.have.jsonBody('data.id'));
        pm.test('not client error', () => { pm.response.to.not.be.clientError; });
        pm.test('ok means 200', () => { pm.response.to.be.ok; });
        ",
    );
    let response = json_response(201, r#"{"data":{"id":9}}"#);

    let output = engine
        .execute_post_response(&script, post_input(response))
        .await
        .unwrap();

    let passed: Vec<bool> = output.test_results.iter().map(|t| t.passed).collect();
    assert_eq!(passed, vec![true, true, true, true, true, false]);
}

#[tokio::test]
async fn test_response_view_and_legacy_globals() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.environment.set('code', pm.response.code);
        pm.environment.set('status', pm.response.status);
        pm.environment.set('time', pm.response.responseTime);
        pm.environment.set('type', pm.response.headers.get('content-type'));
        pm.environment.set('text', pm.response.text());
        pm.environment.set('legacy', responseCode.code + ':' + responseBody);
        pm.environment.set('event', pm.info.eventName);
        ",
    );

    let output = engine
        .execute_post_response(&script, post_input(json_response(404, "nope")))
        .await
        .unwrap();

    let env = &output.environment;
    assert_eq!(env.get("code").unwrap(), "404");
    assert_eq!(env.get("status").unwrap(), "Not Found");
    assert_eq!(env.get("time").unwrap(), "42.5");
    assert_eq!(env.get("type").unwrap(), "application/json");
    assert_eq!(env.get("text").unwrap(), "nope");
    assert_eq!(env.get("legacy").unwrap(), "404:nope");
    assert_eq!(env.get("event").unwrap(), "test");
}

#[tokio::test]
async fn test_invalid_json_body_throws_descriptively() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        try {
            pm.response.json();
            pm.environment.set('parsed', 'yes');
        } catch (e) {
            pm.environment.set('error', e.message);
        }
        ",
    );

    let output = engine
        .execute_post_response(&script, post_input(json_response(200, "<html>")))
        .await
        .unwrap();

    assert!(!output.environment.contains_key("parsed"));
    assert!(
        output
            .environment
            .get("error")
            .unwrap()
            .contains("not valid JSON")
    );
}

#[tokio::test]
async fn test_empty_script_is_a_no_op() {
    let (engine, http) = engine(ScriptSettings::default());
    let input = pre_input();

    let output = engine
        .execute_pre_request(&Script::with_content("  \n "), input.clone())
        .await
        .unwrap();

    assert_eq!(output.url, input.request.url);
    assert_eq!(output.method, input.request.method);
    assert_eq!(output.headers, input.request.headers);
    assert_eq!(output.body, input.request.body);
    assert_eq!(output.params, input.request.params);
    assert_eq!(output.environment, input.environment);
    assert_eq!(output.collection_variables, input.collection_variables);
    assert_eq!(output.execution_time_ms, 0.0);
    assert!(output.console_logs.is_empty());
    assert!(http.calls().is_empty());
}

#[tokio::test]
async fn test_disabled_script_is_skipped() {
    let (engine, _) = engine(ScriptSettings::default());
    let mut script = Script::with_content("throw new Error('never')");
    script.enabled = false;

    let output = engine
        .execute_post_response(&script, post_input(json_response(200, "{}")))
        .await
        .unwrap();

    assert!(output.test_results.is_empty());
    assert_eq!(output.execution_time_ms, 0.0);
}

#[tokio::test]
async fn test_timeout_is_distinct_from_execution_error() {
    let (engine, _) = engine(ScriptSettings::default().with_timeout_ms(100));

    let looping = engine
        .execute_pre_request(
            &Script::with_content("console.log('start'); while (true) {}"),
            pre_input(),
        )
        .await
        .unwrap_err();
    match &looping {
        ScriptError::Timeout {
            limit,
            console_logs,
        } => {
            assert_eq!(*limit, ResourceLimit::WallClock);
            assert_eq!(console_logs[0].message, "start");
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    let thrown = engine
        .execute_pre_request(&Script::with_content("throw new Error('x')"), pre_input())
        .await
        .unwrap_err();
    assert!(!thrown.is_timeout());
    assert_eq!(thrown, ScriptError::execution("x"));
}

#[tokio::test]
async fn test_timeout_inside_test_is_not_swallowed() {
    let (engine, _) = engine(ScriptSettings::default().with_timeout_ms(100));
    let script = Script::with_content("pm.test('spins', () => { while (true) {} });");

    let error = engine
        .execute_post_response(&script, post_input(json_response(200, "{}")))
        .await
        .unwrap_err();

    assert!(error.is_timeout());
}

#[tokio::test]
async fn test_memory_ceiling_reports_timeout_kind() {
    let (engine, _) = engine(ScriptSettings::default().with_memory_limit(8 * 1024 * 1024));
    let script = Script::with_content("const a = []; while (true) { a.push('x'.repeat(4096)); }");

    let error = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ScriptError::Timeout {
            limit: ResourceLimit::Memory,
            ..
        }
    ));
}

#[tokio::test]
async fn test_syntax_error_is_execution_error() {
    let (engine, _) = engine(ScriptSettings::default());

    let error = engine
        .execute_pre_request(&Script::with_content("let = ;"), pre_input())
        .await
        .unwrap_err();

    assert!(matches!(error, ScriptError::Execution { .. }));
}

#[tokio::test]
async fn test_failure_discards_scope_writes_but_keeps_console() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.environment.set('written', '1');
        console.warn('about to fail');
        throw new TypeError('bad input');
        ",
    );

    let error = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap_err();

    match error {
        ScriptError::Execution {
            message,
            console_logs,
        } => {
            assert_eq!(message, "TypeError: bad input");
            assert_eq!(console_logs.len(), 1);
            assert_eq!(console_logs[0].level, ConsoleLevel::Warning);
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_console_levels() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        console.log('a', 1, { b: 2 });
        console.info('info');
        console.debug('debug');
        console.warn('warn');
        console.error('error');
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    let levels: Vec<ConsoleLevel> = output.console_logs.iter().map(|e| e.level).collect();
    assert_eq!(
        levels,
        vec![
            ConsoleLevel::Info,
            ConsoleLevel::Info,
            ConsoleLevel::Info,
            ConsoleLevel::Warning,
            ConsoleLevel::Error,
        ]
    );
    assert_eq!(output.console_logs[0].message, r#"a 1 {"b":2}"#);
}

#[tokio::test]
async fn test_send_request_callbacks_run_in_fifo_order() {
    let (engine, http) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.environment.set('order', '');
        const append = (tag) => pm.environment.set('order', pm.environment.get('order') + tag);
        pm.sendRequest('https://api.test/first', (err, res) => {
            append('1');
            pm.environment.set('firstCode', res.code);
            pm.environment.set('firstUrl', res.json().url);
        });
        pm.sendRequest({
            url: 'https://api.test/second',
            method: 'put',
            header: { 'X-Id': 5 },
            body: { mode: 'raw', raw: 'payload' },
        }, (err, res) => {
            append('2');
            const echoed = res.json();
            pm.environment.set('secondMethod', echoed.method);
            pm.environment.set('secondBody', echoed.body);
            pm.environment.set('size', res.responseSize);
        });
        append('0');
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(
        http.calls(),
        vec!["https://api.test/first", "https://api.test/second"]
    );
    let env = &output.environment;
    assert_eq!(env.get("order").unwrap(), "012");
    assert_eq!(env.get("firstCode").unwrap(), "200");
    assert_eq!(env.get("firstUrl").unwrap(), "https://api.test/first");
    assert_eq!(env.get("secondMethod").unwrap(), "PUT");
    assert_eq!(env.get("secondBody").unwrap(), "payload");
    assert!(env.get("size").unwrap().parse::<usize>().unwrap() > 0);
}

#[tokio::test]
async fn test_callbacks_can_queue_more_requests() {
    let (engine, http) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.sendRequest('https://api.test/a', () => {
            pm.sendRequest('https://api.test/c', () => pm.environment.set('nested', 'done'));
        });
        pm.sendRequest('https://api.test/b', () => {});
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(
        http.calls(),
        vec![
            "https://api.test/a",
            "https://api.test/b",
            "https://api.test/c"
        ]
    );
    assert_eq!(output.environment.get("nested").unwrap(), "done");
}

#[tokio::test]
async fn test_transport_failure_reaches_callback_as_error() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.sendRequest('https://refused.test/', (err, res) => {
            pm.environment.set('error', err.message);
            pm.environment.set('response', String(res));
        });
        pm.sendRequest('not a url', (err) => pm.environment.set('invalid', err ? 'yes' : 'no'));
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert!(
        output
            .environment
            .get("error")
            .unwrap()
            .contains("connection refused")
    );
    assert_eq!(output.environment.get("response").unwrap(), "null");
    assert_eq!(output.environment.get("invalid").unwrap(), "yes");
}

#[tokio::test]
async fn test_throwing_callback_does_not_abort_the_rest() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.sendRequest('https://api.test/one', () => { throw new Error('callback bug'); });
        pm.sendRequest('https://api.test/two', () => pm.environment.set('second', 'ran'));
        pm.environment.set('body', 'ran');
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(output.environment.get("second").unwrap(), "ran");
    assert_eq!(output.environment.get("body").unwrap(), "ran");
}

#[tokio::test]
async fn test_outbound_cap_is_reported_to_the_callback() {
    let (engine, http) = engine(ScriptSettings::default().with_max_outbound_requests(1));
    let script = Script::with_content(
        r"
        pm.sendRequest('https://api.test/1', (err) => pm.environment.set('first', String(err)));
        pm.sendRequest('https://api.test/2', (err) => pm.environment.set('second', err.message));
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(http.calls(), vec!["https://api.test/1"]);
    assert_eq!(output.environment.get("first").unwrap(), "null");
    assert_eq!(
        output.environment.get("second").unwrap(),
        "sendRequest limit of 1 reached"
    );
}

#[tokio::test]
async fn test_slow_outbound_call_times_out_per_request() {
    let settings = ScriptSettings {
        outbound_timeout_ms: 50,
        ..ScriptSettings::default()
    };
    let (engine, _) = engine(settings);
    let script = Script::with_content(
        "pm.sendRequest('https://api.test/slow', (err) => pm.environment.set('error', err.message));",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(
        output.environment.get("error").unwrap(),
        "request timed out after 50ms"
    );
}

#[tokio::test]
async fn test_slow_outbound_call_past_script_deadline_times_out_invocation() {
    let (engine, _) = engine(ScriptSettings::default().with_timeout_ms(150));
    let script = Script::with_content("pm.sendRequest('https://api.test/slow', () => {});");

    let error = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap_err();

    assert!(error.is_timeout());
}

#[tokio::test]
async fn test_require_allowlist() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        const lodash = require('lodash');
        const uuid = require('uuid');
        const moment = require('moment');
        pm.environment.set('sum', lodash.sum(lodash.map([1, 2, 3], (n) => n * 2)));
        pm.environment.set('picked', JSON.stringify(_.pick({ a: 1, b: 2 }, ['a'])));
        pm.environment.set('id', uuid.v4());
        pm.environment.set('date', moment.unix(1709647629).format('YYYY-MM-DD HH:mm:ss'));
        pm.environment.set('iso', moment(0).toISOString());
        pm.environment.set('b64', btoa('user:pass'));
        pm.environment.set('plain', atob('dXNlcjpwYXNz'));
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    let env = &output.environment;
    assert_eq!(env.get("sum").unwrap(), "12");
    assert_eq!(env.get("picked").unwrap(), r#"{"a":1}"#);
    assert_eq!(env.get("id").unwrap().len(), 36);
    assert_eq!(env.get("date").unwrap(), "2024-03-05 14:07:09");
    assert_eq!(env.get("iso").unwrap(), "1970-01-01T00:00:00.000Z");
    assert_eq!(env.get("b64").unwrap(), "dXNlcjpwYXNz");
    assert_eq!(env.get("plain").unwrap(), "user:pass");
}

#[tokio::test]
async fn test_unknown_module_fails_with_its_name() {
    let (engine, _) = engine(ScriptSettings::default());

    let error = engine
        .execute_pre_request(&Script::with_content("require('fs')"), pre_input())
        .await
        .unwrap_err();

    match error {
        ScriptError::Execution { message, .. } => assert!(message.contains("'fs'"), "{message}"),
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_replace_in_resolves_scopes_and_dynamic_variables() {
    let (engine, _) = engine(ScriptSettings::default());
    let mut input = pre_input();
    input.environment = vars(&[("host", "api.test"), ("base", "https://{{host}}")]);
    let script = Script::with_content(
        r"
        pm.environment.set('url', pm.variables.replaceIn('{{base}}/{{version}}/{{missing}}'));
        pm.environment.set('ids', pm.variables.replaceIn('{{$guid}}|{{$guid}}'));
        pm.environment.set('legacy', pm.variables.replaceIn('$timestamp'));
        ",
    );
    input.collection_variables = vars(&[("version", "v2")]);

    let output = engine.execute_pre_request(&script, input).await.unwrap();

    let env = &output.environment;
    assert_eq!(env.get("url").unwrap(), "https://api.test/v2/{{missing}}");
    let ids: Vec<&str> = env.get("ids").unwrap().split('|').collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0].len(), 36);
    assert_ne!(ids[0], ids[1]);
    assert!(env.get("legacy").unwrap().chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_replace_in_leaves_dollar_text_in_values_alone() {
    let (engine, _) = engine(ScriptSettings::default());
    let mut input = pre_input();
    input.environment = vars(&[("secret", "pa$randomInt")]);
    let script = Script::with_content(
        r"pm.environment.set('resolved', pm.variables.replaceIn('{{secret}}'));",
    );

    let output = engine.execute_pre_request(&script, input).await.unwrap();

    assert_eq!(output.environment.get("resolved").unwrap(), "pa$randomInt");
}

#[tokio::test]
async fn test_cookies_are_seeded_from_the_response() {
    let (engine, _) = engine(ScriptSettings::default());
    let response = json_response(200, "{}").with_header("Set-Cookie", "sid=abc123; Path=/; HttpOnly");
    let script = Script::with_content(
        r"
        pm.environment.set('sid', pm.cookies.get('sid'));
        pm.cookies.set('extra', 'x');
        pm.environment.set('names', Object.keys(pm.cookies.toObject()).sort().join(','));
        pm.cookies.clear();
        pm.environment.set('after', pm.cookies.has('sid'));
        ",
    );

    let output = engine
        .execute_post_response(&script, post_input(response))
        .await
        .unwrap();

    let env = &output.environment;
    assert_eq!(env.get("sid").unwrap(), "abc123");
    assert_eq!(env.get("names").unwrap(), "extra,sid");
    assert_eq!(env.get("after").unwrap(), "false");
}

#[tokio::test]
async fn test_send_request_carries_jar_cookies() {
    let (engine, _) = engine(ScriptSettings::default());
    let response = json_response(200, "{}").with_header("Set-Cookie", "sid=abc123; Path=/");
    let script = Script::with_content(
        r"
        pm.cookies.set('theme', 'dark');
        pm.sendRequest('https://api.test/me', (err, res) => {
            pm.environment.set('sent', res.json().cookie);
        });
        ",
    );

    let output = engine
        .execute_post_response(&script, post_input(response))
        .await
        .unwrap();

    assert_eq!(
        output.environment.get("sent").unwrap(),
        "sid=abc123; theme=dark"
    );
}

#[tokio::test]
async fn test_postman_aliases_and_info() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        postman.setEnvironmentVariable('legacy', 'yes');
        postman.setGlobalVariable('g', postman.getEnvironmentVariable('token'));
        pm.environment.set('event', pm.info.eventName);
        pm.environment.set('iteration', pm.info.iteration + '/' + pm.info.iterationCount);
        pm.environment.set('requestId', pm.info.requestId);
        ",
    );

    let output = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    let env = &output.environment;
    assert_eq!(env.get("legacy").unwrap(), "yes");
    assert_eq!(output.globals.get("g").unwrap(), "t-1");
    assert_eq!(env.get("event").unwrap(), "prerequest");
    assert_eq!(env.get("iteration").unwrap(), "1/1");
    assert!(!env.get("requestId").unwrap().is_empty());
}

#[tokio::test]
async fn test_each_invocation_gets_a_fresh_context() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content(
        r"
        pm.environment.set('id', pm.info.requestId);
        pm.environment.set('hadLocal', pm.variables.has('scratch'));
        pm.variables.set('scratch', '1');
        globalThis.leaked = true;
        ",
    );

    let first = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();
    let second = engine
        .execute_pre_request(
            &Script::with_content("pm.environment.set('leaked', typeof leaked);"),
            pre_input(),
        )
        .await
        .unwrap();
    let third = engine
        .execute_pre_request(&script, pre_input())
        .await
        .unwrap();

    assert_eq!(first.environment.get("hadLocal").unwrap(), "false");
    assert_eq!(second.environment.get("leaked").unwrap(), "undefined");
    assert_eq!(third.environment.get("hadLocal").unwrap(), "false");
    assert_ne!(first.environment.get("id"), third.environment.get("id"));
}

#[tokio::test]
async fn test_pm_request_is_absent_in_post_response() {
    let (engine, _) = engine(ScriptSettings::default());
    let script = Script::with_content("pm.environment.set('request', typeof pm.request);");

    let output = engine
        .execute_post_response(&script, post_input(json_response(200, "{}")))
        .await
        .unwrap();

    assert_eq!(output.environment.get("request").unwrap(), "undefined");
}
