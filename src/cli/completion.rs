// Shell completion script generation

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletionShell {
    Bash,
}

const BASH_COMPLETION: &str = r#"
_sagectl_completion()
{
    local cur prev words cword
    _get_comp_words_by_ref -n : cur prev words cword

    if [[ ${cword} -eq 1 ]]; then
        COMPREPLY=( $(compgen -W "open close list browser completion mcp" -- "${cur}") )
        return 0
    fi

    local command="${words[1]}"
    case "${command}" in
        open)
            if [[ "$cur" == -* ]]; then
                COMPREPLY=( $(compgen -W "--name --local-address --local-port --external-port --protocol --host --json" -- "${cur}") )
            else
                case "${prev}" in
                    --protocol)
                        COMPREPLY=( $(compgen -W "tcp udp tcp_udp" -- "${cur}") )
                        ;;
                esac
            fi
            ;;
        close)
            if [[ "$cur" == -* ]]; then
                COMPREPLY=( $(compgen -W "--port --host --json" -- "${cur}") )
            fi
            ;;
        list|browser|mcp)
            if [[ "$cur" == -* ]]; then
                COMPREPLY=( $(compgen -W "--host --json" -- "${cur}") )
            fi
            ;;
        completion)
            if [[ ${cword} -eq 2 ]]; then
                COMPREPLY=( $(compgen -W "bash" -- "${cur}") )
            fi
            ;;
    esac
}
complete -F _sagectl_completion sagectl
"#;

/// Print the completion script for the requested shell.
pub fn generate(shell: CompletionShell) -> bool {
    match shell {
        CompletionShell::Bash => {
            println!("{}", BASH_COMPLETION.trim());
            println!("\n# To enable completion, add the following to your .bashrc or .bash_profile:");
            println!("# eval \"$(sagectl completion bash)\"");
            eprintln!("# Note: You may need to restart your shell for changes to take effect.");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_script_covers_all_subcommands() {
        for subcommand in ["open", "close", "list", "browser", "completion", "mcp"] {
            assert!(BASH_COMPLETION.contains(subcommand));
        }
        assert!(BASH_COMPLETION.contains("complete -F _sagectl_completion sagectl"));
    }
}
