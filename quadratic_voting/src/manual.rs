/*!

This is the long-form manual for `quadratic_voting` and `qvote`.

## Quadratic voting

Every voter receives the same budget of credits. Casting `n` votes on one
option costs `n²` credits, so the second vote on an option costs 3 credits,
the third one 5, and so on. A voter who cares a lot about a single option can
still express it, but spreading the votes is always cheaper.

With 100 credits, `{Hot springs: 5}` costs 25 credits and
`{Hot springs: 3, BBQ: 2}` costs 9 + 4 = 13 credits. `{Hot springs: 10}`
costs exactly 100 credits and is accepted, `{Hot springs: 10, BBQ: 1}` costs
101 and is rejected.

## Configuration

The poll is described by a JSON document (`config.json` by default):

```text
{
  "title": "Summer trip",
  "options": ["温泉", "BBQ", "テーマパーク", "ハイキング"],
  "credits": 100,
  "rules": {
    "forbidFullBudgetOnOneOption": false,
    "requireSpentCredits": false
  }
}
```

- `title` (string, required): displayed on top of the results.
- `options` (array of strings, required): the options, in display order. This
  order also breaks ties in the results. Names must be unique and non-empty.
- `credits` (positive integer, required): the budget of every voter.
- `rules` (object, optional):
  - `forbidFullBudgetOnOneOption` (default `false`): when there is more than
    one option, a single option may not take the whole budget.
  - `requireSpentCredits` (default `false`): a ballot that leaves credits
    unspent while another vote would still fit is rejected.

The program refuses to start with an invalid configuration.

## Vote store

Ballots are appended to a JSON Lines file (`votes.jsonl` by default), one
ballot per line:

```text
{"username":"山田花子","votes":{"BBQ":4,"ハイキング":1,"テーマパーク":1,"温泉":9},"vote_datetime":"2025-07-01 20:22:17"}
```

Records are never modified or removed by the program. The position of a line
in the file is its submission order.

## Commands

- `qvote check`: validates the configuration.
- `qvote quote --votes 温泉=5 --votes BBQ=2`: shows what a ballot would cost,
  without recording it.
- `qvote vote --voter 山田花子 --votes 温泉=5 --votes BBQ=2`: records a ballot.
  Options that are not mentioned get zero votes.
- `qvote results`: tallies the ballots and prints a chart. Useful flags:
  - `--mode credits` sums the credits spent instead of the votes.
  - `--latest-per-voter` only counts the latest ballot of every voter.
  - `--out summary.json` (or `--out stdout`) writes a summary in JSON.
  - `--reference expected.json` compares the summary with a reference file
    and fails when they differ.
  - `--table voters.csv` writes one row per ballot.

Changing the options of a poll after ballots have been recorded is not
reconciled: votes for options that are no longer listed are ignored by the
tally (a warning is logged).

 */
