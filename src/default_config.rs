pub const DEFAULT_CONFIG_TOML: &str = r#"[feed]
endpoint = "https://clist.by/api/v4/contest/"
# clist.by resource ids: 1 = codeforces.com, 93 = atcoder.jp
resource_ids = [1, 93]
window_hours = 48
timeout_secs = 5

[credential]
env_var = "CLIST_API_KEY"
env_file = "~/.dotfiles/cp-tools-api/.config/cp-tools/api/.env"

[terminal]
command = ["alacritty", "-e", "bash", "-c", "{script}"]

[launch]
workspace_command = ["i3-msg", "workspace", "{name}"]
browser_command = ["firefox", "{url}"]
scaffold_script = "source ~/.bashrc; scaffold {name}; nvim .; exec bash"

[mode]
on_script = "~/.config/cp-tools/scripts/contest-on.sh"
off_script = "~/.config/cp-tools/scripts/contest-off.sh"
acknowledge_script = "{script}; read -p 'Press Enter to close...'"

[status_bar]
window_hours = 24
max_event_chars = 30

[rating]
endpoint = "https://codeforces.com/api/user.info"
codeforces_handle = ""
"#;
