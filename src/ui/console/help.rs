use crate::ui::command::parser;

pub const HELP: &str = r#"
Available commands:

view regs|mem|disasm                         -- focus a view, navigation applies to the focused view
views <view> [<view>...]                     -- set views requested on each refresh
<, <<, <<<, >, >>, >>>                       -- move inspection window backward or forward
g, goto <addr>                               -- inspect from address
s, step                                      -- execute one instruction
n, next                                      -- execute one instruction, step over subroutine calls
t, toggle                                    -- stop a running target or resume a stopped one
pause                                        -- stop a running target
c, continue                                  -- resume a stopped target
r, refresh                                   -- refresh active views
lines <number>                               -- set number of lines in memory and disassembly views
follow on|off                                -- re-anchor views at program counter after each stop
load <file> [<addr>]                         -- load file contents into target memory
save <file> <addr> <length>                  -- save target memory into file
!, raw <text>                                -- send text to the target as is, print the reply
h, help <>|<command>                         -- show help
q, quit                                      -- exit
"#;

pub const HELP_VIEW: &str = "\
\x1b[32;1mview\x1b[0m
Focus a view. Focused view becomes active if it isn't, navigation moves apply to it only.

Available views:
regs, registers - cpu registers, changed since previous refresh are highlighted
mem, memory - memory dump, 16 bytes per row
disasm, disassembly - disassembled instructions
";

pub const HELP_VIEWS: &str = "\
\x1b[32;1mviews\x1b[0m
Set views requested on each refresh, the focused view always stays active.

Examples of usage:
views regs disasm - show registers and disassembly after each stop
";

pub const HELP_MOVE: &str = "\
\x1b[32;1m<, <<, <<<, >, >>, >>>\x1b[0m
Move inspection window of the focused view, more arrows mean a larger step.

memory: 2 bytes, one row (16 bytes), one screenful
disassembly: backward steps approximate instruction boundaries, forward steps
continue from the second shown instruction or after the last shown one
";

pub const HELP_GOTO: &str = "\
\x1b[32;1mg, goto\x1b[0m
Inspect from an explicit address, address is hexadecimal, `$` and `0x` prefixes are allowed.

Examples of usage:
goto $fc0030
";

pub const HELP_STEP: &str = "\
\x1b[32;1ms, step\x1b[0m
Execute a single instruction and refresh views. Ignored while the target is running.
";

pub const HELP_NEXT: &str = "\
\x1b[32;1mn, next\x1b[0m
Execute a single instruction, subroutine calls are executed as a whole. Ignored while the target is running.
";

pub const HELP_TOGGLE: &str = "\
\x1b[32;1mt, toggle\x1b[0m
Stop a running target or resume a stopped one. Views refresh as soon as the target reports the stop.
";

pub const HELP_PAUSE: &str = "\
\x1b[32;1mpause\x1b[0m
Stop a running target.
";

pub const HELP_CONTINUE: &str = "\
\x1b[32;1mc, continue\x1b[0m
Resume a stopped target.
";

pub const HELP_REFRESH: &str = "\
\x1b[32;1mr, refresh\x1b[0m
Request all active views again.
";

pub const HELP_LINES: &str = "\
\x1b[32;1mlines\x1b[0m
Set number of lines in memory and disassembly views (5 to 50). The value is saved into configuration file.
";

pub const HELP_FOLLOW: &str = "\
\x1b[32;1mfollow\x1b[0m
Re-anchor views at program counter each time the target stops. The value is saved into configuration file.

Examples of usage:
follow off - keep inspecting the same address across stops
";

pub const HELP_LOAD: &str = "\
\x1b[32;1mload\x1b[0m
Load file contents into target memory, first address of the inspection window is used if address is omitted.

Examples of usage:
load /tmp/patch.bin $10000
";

pub const HELP_SAVE: &str = "\
\x1b[32;1msave\x1b[0m
Save target memory range into file.

Examples of usage:
save /tmp/dump.bin $10000 $400 - save 1024 bytes from address $10000
";

pub const HELP_RAW: &str = "\
\x1b[32;1m!, raw\x1b[0m
Send text to the target as is, print the reply.

Examples of usage:
! info video
";

pub const HELP_QUIT: &str = "\
\x1b[32;1mq, quit\x1b[0m
Exit, the target keeps its execution state.
";

pub fn help_for_command(command: Option<&str>) -> &str {
    match command {
        None => HELP,
        Some(parser::VIEW_COMMAND) => HELP_VIEW,
        Some(parser::VIEWS_COMMAND) => HELP_VIEWS,
        Some(parser::MOVE_COMMAND) => HELP_MOVE,
        Some(parser::GOTO_COMMAND) | Some(parser::GOTO_COMMAND_SHORT) => HELP_GOTO,
        Some(parser::STEP_INTO_COMMAND) | Some(parser::STEP_INTO_COMMAND_SHORT) => HELP_STEP,
        Some(parser::STEP_OVER_COMMAND) | Some(parser::STEP_OVER_COMMAND_SHORT) => HELP_NEXT,
        Some(parser::TOGGLE_COMMAND) | Some(parser::TOGGLE_COMMAND_SHORT) => HELP_TOGGLE,
        Some(parser::PAUSE_COMMAND) => HELP_PAUSE,
        Some(parser::CONTINUE_COMMAND) | Some(parser::CONTINUE_COMMAND_SHORT) => HELP_CONTINUE,
        Some(parser::REFRESH_COMMAND) | Some(parser::REFRESH_COMMAND_SHORT) => HELP_REFRESH,
        Some(parser::LINES_COMMAND) => HELP_LINES,
        Some(parser::FOLLOW_COMMAND) => HELP_FOLLOW,
        Some(parser::LOAD_COMMAND) => HELP_LOAD,
        Some(parser::SAVE_COMMAND) => HELP_SAVE,
        Some(parser::RAW_COMMAND) => HELP_RAW,
        Some("q") | Some("quit") => HELP_QUIT,
        _ => "unknown command",
    }
}
