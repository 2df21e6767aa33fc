/// Embedded single-page chat UI with the debug panel. Served at `/`.
pub const CHAT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Nudge</title>
<style>
  body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 0; background: #f4f5f7; }
  .wrap { display: flex; max-width: 1100px; margin: 0 auto; gap: 16px; padding: 16px; }
  .chat { flex: 2; background: #fff; border-radius: 8px; padding: 16px; display: flex; flex-direction: column; height: 85vh; }
  .debug { flex: 1; background: #fff; border-radius: 8px; padding: 16px; overflow-y: auto; height: 85vh; }
  #messages { flex: 1; overflow-y: auto; list-style: none; margin: 0 0 12px; padding: 0; }
  #messages li { margin: 6px 0; padding: 8px 12px; border-radius: 8px; max-width: 80%; white-space: pre-wrap; }
  #messages li.user { background: #2563eb; color: #fff; margin-left: auto; }
  #messages li.assistant { background: #e5e7eb; }
  #messages li.error { background: #fee2e2; color: #991b1b; }
  form { display: flex; gap: 8px; }
  input[type=text] { flex: 1; padding: 10px; border: 1px solid #d1d5db; border-radius: 6px; }
  button { padding: 10px 18px; border: 0; border-radius: 6px; background: #2563eb; color: #fff; cursor: pointer; }
  h2 { margin-top: 0; font-size: 15px; }
  .debug h3 { font-size: 13px; margin: 12px 0 4px; text-transform: uppercase; color: #6b7280; }
  .debug ul { margin: 0; padding-left: 18px; font-size: 12px; }
  .debug li { margin: 2px 0; word-break: break-all; }
</style>
</head>
<body>
<div class="wrap">
  <div class="chat">
    <h2>Nudge — reminder assistant</h2>
    <ul id="messages"></ul>
    <form id="chat-form">
      <input type="text" id="message" placeholder="remind me to pay rent tomorrow 9am" autocomplete="off">
      <button type="submit">Send</button>
    </form>
  </div>
  <div class="debug">
    <h2>Debug panel</h2>
    <h3>Mem0 queries</h3><ul id="debug-mem0"></ul>
    <h3>Tool calls</h3><ul id="debug-tools"></ul>
    <h3>DB changes</h3><ul id="debug-db"></ul>
    <h3>Behavior</h3><ul id="debug-behavior"></ul>
    <h3>Elapsed</h3><ul id="debug-elapsed"></ul>
  </div>
</div>
<script>
  var form = document.getElementById('chat-form');
  var input = document.getElementById('message');
  var messages = document.getElementById('messages');
  var userId = 'default_user';

  function escapeHtml(text) {
    var div = document.createElement('div');
    div.appendChild(document.createTextNode(text));
    return div.innerHTML;
  }

  function appendMessage(role, text) {
    var li = document.createElement('li');
    li.className = role;
    li.innerHTML = escapeHtml(text);
    messages.appendChild(li);
    messages.scrollTop = messages.scrollHeight;
  }

  function renderList(id, items) {
    var list = document.getElementById(id);
    list.innerHTML = '';
    (items || []).forEach(function (item) {
      var li = document.createElement('li');
      li.textContent = typeof item === 'string' ? item : JSON.stringify(item);
      list.appendChild(li);
    });
  }

  function renderDebug(data) {
    var debug = data.debug || {};
    renderList('debug-mem0', debug.mem0_queries);
    renderList('debug-tools', (debug.tool_calls || []).map(function (c) {
      return c.tool + ' ' + JSON.stringify(c.input || {});
    }));
    renderList('debug-db', debug.db_changes);
    renderList('debug-behavior', debug.behavior);
    renderList('debug-elapsed', data.elapsed ? [data.elapsed.toFixed(2) + 's'] : []);
  }

  form.addEventListener('submit', function (event) {
    event.preventDefault();
    var text = input.value.trim();
    if (!text) return;
    appendMessage('user', text);
    input.value = '';

    var body = new URLSearchParams();
    body.set('message', text);
    body.set('user_id', userId);

    fetch('/chat', { method: 'POST', body: body })
      .then(function (resp) {
        if (!resp.ok) throw new Error('http ' + resp.status);
        return resp.json();
      })
      .then(function (data) {
        appendMessage('assistant', data.response || '');
        renderDebug(data);
      })
      .catch(function () {
        appendMessage('error', 'Something went wrong');
      });
  });
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::CHAT_PAGE;

    #[test]
    fn page_escapes_user_text_before_insertion() {
        assert!(CHAT_PAGE.contains("escapeHtml"));
        assert!(CHAT_PAGE.contains("createTextNode"));
    }

    #[test]
    fn page_posts_form_encoded_chat_requests() {
        assert!(CHAT_PAGE.contains("fetch('/chat'"));
        assert!(CHAT_PAGE.contains("URLSearchParams"));
        assert!(CHAT_PAGE.contains("Something went wrong"));
    }

    #[test]
    fn debug_panel_sections_are_present() {
        for id in ["debug-mem0", "debug-tools", "debug-db", "debug-behavior"] {
            assert!(CHAT_PAGE.contains(id), "missing {id}");
        }
    }
}
